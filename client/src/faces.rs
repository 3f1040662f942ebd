//! Face table and image fetch bookkeeping.
//!
//! Faces are created on first reference with shared placeholder bitmaps and
//! filled in when their pixels arrive. Fetches go out as `askface` commands
//! with a hard cap on how many may be in flight at once.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use ew_core::constants::{CONCURRENT_FETCH_LIMIT, EMPTY_FACE, SQUARE_SIZE};
use ew_core::error::ProtocolError;
use ew_core::types::map::SquareFace;
use image::{Rgba, RgbaImage};

/// Both resolutions of one face: the original 32 px/tile bitmap and the
/// deterministic 2x upscale.
pub struct FaceImages {
    pub original: RgbaImage,
    pub big: RgbaImage,
}

impl FaceImages {
    fn from_original(original: RgbaImage) -> Self {
        let big = scale2x(&original);
        Self { original, big }
    }
}

/// One image resource. Shared by reference from every square displaying it.
pub struct Face {
    pub id: u16,
    pub name: String,
    pub checksum: u32,
    pub images: Arc<FaceImages>,
    /// Whether real pixels (or the decode-failure placeholder) have arrived.
    pub loaded: bool,
}

impl Face {
    /// Footprint in tile units, derived from the original-resolution image.
    /// Multi-tile images are assumed to be exact multiples of the tile size.
    pub fn tile_size(&self) -> (usize, usize) {
        let w = self.images.original.width().div_ceil(SQUARE_SIZE).max(1);
        let h = self.images.original.height().div_ceil(SQUARE_SIZE).max(1);
        (w as usize, h as usize)
    }

    pub fn square_face(&self) -> SquareFace {
        let (tile_w, tile_h) = self.tile_size();
        SquareFace {
            id: self.id,
            tile_w,
            tile_h,
        }
    }
}

/// Face table plus the two fetch sets: `wanted` holds every id that should
/// eventually be fetched, `pending` the subset already on the wire.
pub struct FaceCache {
    faces: HashMap<u16, Face>,
    wanted: BTreeSet<u16>,
    pending: HashSet<u16>,
    placeholder: Arc<FaceImages>,
    unknown: Arc<FaceImages>,
    cache_dir: Option<PathBuf>,
}

impl FaceCache {
    pub fn new(cache_dir: Option<PathBuf>) -> Self {
        Self {
            faces: HashMap::new(),
            wanted: BTreeSet::new(),
            pending: HashSet::new(),
            placeholder: Arc::new(FaceImages::from_original(blank_tile())),
            unknown: Arc::new(FaceImages::from_original(unknown_tile())),
            cache_dir,
        }
    }

    /// Guarantees a face object with non-null image handles exists for an
    /// id. Never performs I/O and never touches the fetch sets.
    pub fn ensure_exists(&mut self, id: u16) -> &Face {
        self.ensure_exists_mut(id)
    }

    pub fn face(&self, id: u16) -> Option<&Face> {
        self.faces.get(&id)
    }

    /// Footprint snapshot for setting this face on a map square.
    pub fn square_face(&mut self, id: u16) -> SquareFace {
        self.ensure_exists(id).square_face()
    }

    /// Marks an id as wanted. Already-wanted ids are a no-op.
    pub fn request_fetch(&mut self, id: u16) {
        if id == EMPTY_FACE {
            return;
        }
        self.wanted.insert(id);
    }

    /// Tops up the in-flight set and returns the ids to put on the wire,
    /// never letting more than `CONCURRENT_FETCH_LIMIT` be pending at once.
    pub fn take_fetches(&mut self) -> Vec<u16> {
        let mut out = Vec::new();
        for &id in &self.wanted {
            if self.pending.len() >= CONCURRENT_FETCH_LIMIT {
                break;
            }
            if self.pending.insert(id) {
                out.push(id);
            }
        }
        out
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Stores arrived pixels for a face. Undecodable bytes substitute the
    /// shared "unknown" bitmaps and report the failure; the session goes on.
    pub fn store_image(&mut self, id: u16, bytes: &[u8]) -> Result<(), ProtocolError> {
        if !self.pending.remove(&id) {
            log::warn!("received image for face {id} that was never pending");
        }
        self.wanted.remove(&id);

        let unknown = Arc::clone(&self.unknown);
        let face = self.ensure_exists_mut(id);

        match image::load_from_memory(bytes) {
            Ok(img) => {
                let images = Arc::new(FaceImages::from_original(img.to_rgba8()));
                face.images = Arc::clone(&images);
                face.loaded = true;
                let name = face.name.clone();
                self.write_disk_cache(&name, &images);
                Ok(())
            }
            Err(e) => {
                log::warn!("face {id} image failed to decode: {e}");
                face.images = unknown;
                face.loaded = true;
                Err(ProtocolError::ImageDecodeFailure { face: id })
            }
        }
    }

    fn ensure_exists_mut(&mut self, id: u16) -> &mut Face {
        let placeholder = Arc::clone(&self.placeholder);
        self.faces.entry(id).or_insert_with(|| Face {
            id,
            name: String::new(),
            checksum: 0,
            images: placeholder,
            loaded: false,
        })
    }

    /// Handles a `face1` definition: records metadata, then either loads
    /// the pixels from the disk cache or queues a fetch.
    pub fn define_face(&mut self, id: u16, checksum: u32, name: &str) {
        let cached = self.load_disk_cache(name);
        let hit = cached.is_some();
        let face = self.ensure_exists_mut(id);
        face.name = name.to_string();
        face.checksum = checksum;
        if let Some(images) = cached {
            face.images = images;
            face.loaded = true;
        }
        if hit {
            // A fetch queued before the definition arrived is now moot.
            self.wanted.remove(&id);
        } else {
            self.request_fetch(id);
        }
    }

    fn cache_paths(&self, name: &str) -> Option<(PathBuf, PathBuf)> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return None;
        }
        let dir = self.cache_dir.as_ref()?;
        Some((
            dir.join(format!("{name}.x1.png")),
            dir.join(format!("{name}.x2.png")),
        ))
    }

    fn load_disk_cache(&self, name: &str) -> Option<Arc<FaceImages>> {
        let (p1, p2) = self.cache_paths(name)?;
        let original = image::open(p1).ok()?.to_rgba8();
        let big = image::open(p2).ok()?.to_rgba8();
        Some(Arc::new(FaceImages { original, big }))
    }

    fn write_disk_cache(&self, name: &str, images: &FaceImages) {
        let Some((p1, p2)) = self.cache_paths(name) else {
            return;
        };
        if let Some(dir) = self.cache_dir.as_ref() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                log::warn!("cannot create face cache dir {dir:?}: {e}");
                return;
            }
        }
        if let Err(e) = images.original.save(&p1) {
            log::warn!("cannot write face cache file {p1:?}: {e}");
        }
        if let Err(e) = images.big.save(&p2) {
            log::warn!("cannot write face cache file {p2:?}: {e}");
        }
    }
}

/// Fully transparent tile used for faces whose pixels have not arrived.
fn blank_tile() -> RgbaImage {
    RgbaImage::from_pixel(SQUARE_SIZE, SQUARE_SIZE, Rgba([0, 0, 0, 0]))
}

/// Checkerboard tile substituted for undecodable face data.
fn unknown_tile() -> RgbaImage {
    RgbaImage::from_fn(SQUARE_SIZE, SQUARE_SIZE, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgba([255, 0, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    })
}

/// Scale2x (EPX): doubles an image without interpolation. Each source pixel
/// expands to four; a corner copies an edge neighbor only when that neighbor
/// matches the perpendicular edge and the opposing neighbors disagree.
pub fn scale2x(src: &RgbaImage) -> RgbaImage {
    let (w, h) = src.dimensions();
    let mut out = RgbaImage::new(w * 2, h * 2);
    for y in 0..h {
        for x in 0..w {
            let p = *src.get_pixel(x, y);
            let a = *src.get_pixel(x, y.saturating_sub(1));
            let b = *src.get_pixel((x + 1).min(w - 1), y);
            let c = *src.get_pixel(x.saturating_sub(1), y);
            let d = *src.get_pixel(x, (y + 1).min(h - 1));

            let mut e0 = p;
            let mut e1 = p;
            let mut e2 = p;
            let mut e3 = p;
            if c == a && c != d && a != b {
                e0 = a;
            }
            if a == b && a != c && b != d {
                e1 = b;
            }
            if d == c && d != a && c != b {
                e2 = c;
            }
            if b == d && b != c && d != a {
                e3 = d;
            }

            out.put_pixel(2 * x, 2 * y, e0);
            out.put_pixel(2 * x + 1, 2 * y, e1);
            out.put_pixel(2 * x, 2 * y + 1, e2);
            out.put_pixel(2 * x + 1, 2 * y + 1, e3);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_exists_creates_placeholder_without_fetching() {
        let mut cache = FaceCache::new(None);
        let face = cache.ensure_exists(12);
        assert_eq!(face.id, 12);
        assert!(!face.loaded);
        assert_eq!(face.tile_size(), (1, 1));
        assert!(cache.take_fetches().is_empty());
    }

    #[test]
    fn pending_never_exceeds_the_cap() {
        let mut cache = FaceCache::new(None);
        for id in 1..=40u16 {
            cache.request_fetch(id);
        }
        let first = cache.take_fetches();
        assert_eq!(first.len(), CONCURRENT_FETCH_LIMIT);
        assert_eq!(cache.pending_len(), CONCURRENT_FETCH_LIMIT);

        // Re-running the top-up with a full pipe sends nothing new.
        assert!(cache.take_fetches().is_empty());

        // A response frees one slot; the next top-up refills exactly it.
        let _ = cache.store_image(first[0], &[]);
        let refill = cache.take_fetches();
        assert_eq!(refill.len(), 1);
        assert_eq!(cache.pending_len(), CONCURRENT_FETCH_LIMIT);
    }

    #[test]
    fn duplicate_request_fetch_is_a_noop() {
        let mut cache = FaceCache::new(None);
        cache.request_fetch(5);
        cache.request_fetch(5);
        assert_eq!(cache.take_fetches(), vec![5]);
        assert_eq!(cache.pending_len(), 1);
    }

    #[test]
    fn empty_face_is_never_fetched() {
        let mut cache = FaceCache::new(None);
        cache.request_fetch(EMPTY_FACE);
        assert!(cache.take_fetches().is_empty());
    }

    #[test]
    fn bad_image_bytes_substitute_the_unknown_tile() {
        let mut cache = FaceCache::new(None);
        cache.request_fetch(9);
        cache.take_fetches();
        let err = cache.store_image(9, b"not a png").unwrap_err();
        assert!(matches!(err, ProtocolError::ImageDecodeFailure { face: 9 }));

        let face = cache.face(9).unwrap();
        assert!(face.loaded);
        assert_eq!(face.images.original.dimensions(), (SQUARE_SIZE, SQUARE_SIZE));
        assert_eq!(
            face.images.big.dimensions(),
            (SQUARE_SIZE * 2, SQUARE_SIZE * 2)
        );
        assert_eq!(cache.pending_len(), 0);
    }

    #[test]
    fn good_image_bytes_populate_both_resolutions() {
        let mut cache = FaceCache::new(None);
        let img = RgbaImage::from_pixel(64, 32, Rgba([10, 20, 30, 255]));
        let mut png = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut png),
            image::ImageOutputFormat::Png,
        )
        .unwrap();

        cache.request_fetch(3);
        cache.take_fetches();
        cache.store_image(3, &png).unwrap();

        let face = cache.face(3).unwrap();
        assert!(face.loaded);
        assert_eq!(face.images.original.dimensions(), (64, 32));
        assert_eq!(face.images.big.dimensions(), (128, 64));
        // A 64x32 image covers 2x1 tiles.
        assert_eq!(face.tile_size(), (2, 1));
    }

    #[test]
    fn disk_cache_hit_drops_a_queued_fetch() {
        let dir = std::env::temp_dir().join(format!("ew-faces-{}", std::process::id()));
        let img = RgbaImage::from_pixel(32, 32, Rgba([5, 6, 7, 255]));
        let mut png = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut png),
            image::ImageOutputFormat::Png,
        )
        .unwrap();

        // First session fills the disk cache.
        let mut cache = FaceCache::new(Some(dir.clone()));
        cache.define_face(7, 123, "tree");
        cache.take_fetches();
        cache.store_image(7, &png).unwrap();

        // Second session sees the face referenced before its definition.
        let mut cache = FaceCache::new(Some(dir.clone()));
        cache.request_fetch(7);
        cache.define_face(7, 123, "tree");
        assert!(cache.face(7).unwrap().loaded);
        assert!(cache.take_fetches().is_empty());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn scale2x_doubles_dimensions() {
        let img = RgbaImage::from_pixel(3, 5, Rgba([1, 2, 3, 4]));
        let out = scale2x(&img);
        assert_eq!(out.dimensions(), (6, 10));
    }

    #[test]
    fn scale2x_rounds_a_corner() {
        // A 3x3 cross of X on background O. EPX should pull the X arms into
        // the corners adjacent to two matching edge neighbors.
        let o = Rgba([0u8, 0, 0, 255]);
        let x = Rgba([255u8, 255, 255, 255]);
        let mut img = RgbaImage::from_pixel(3, 3, o);
        img.put_pixel(1, 0, x);
        img.put_pixel(0, 1, x);
        img.put_pixel(1, 1, x);
        img.put_pixel(2, 1, x);
        img.put_pixel(1, 2, x);

        let out = scale2x(&img);
        // Center pixel (1,1): A=C=X on the top-left corner, B=D=X elsewhere;
        // all four neighbors equal X, so no corner rule fires and the pixel
        // stays X.
        assert_eq!(*out.get_pixel(2, 2), x);
        // Top-left background pixel (0,0): its right neighbor and bottom
        // neighbor are X, so its bottom-right sub-pixel becomes X.
        assert_eq!(*out.get_pixel(1, 1), x);
        assert_eq!(*out.get_pixel(0, 0), o);
    }

    #[test]
    fn unexpected_image_is_logged_not_fatal() {
        let mut cache = FaceCache::new(None);
        // Never requested; still stored.
        let img = RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 255]));
        let mut png = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut png),
            image::ImageOutputFormat::Png,
        )
        .unwrap();
        cache.store_image(77, &png).unwrap();
        assert!(cache.face(77).unwrap().loaded);
    }
}
