//! Outbound command bodies. Builders produce the unframed
//! `<name>[' '<body>]` bytes; the packet writer prepends the length.
//!
//! Numeric arguments of the text-form commands are ASCII decimals; `mark`,
//! `lock` and `ncom` carry binary fields after their name.

pub fn version(cs: u32, sc: u32, info: &str) -> Vec<u8> {
    format!("version {cs} {sc} {info}").into_bytes()
}

pub fn toggleextendedtext(types: &[u32]) -> Vec<u8> {
    let mut body = String::from("toggleextendedtext");
    for t in types {
        body.push(' ');
        body.push_str(&t.to_string());
    }
    body.into_bytes()
}

pub fn setup(pairs: &[(&str, String)]) -> Vec<u8> {
    let mut body = String::from("setup");
    for (key, value) in pairs {
        body.push(' ');
        body.push_str(key);
        body.push(' ');
        body.push_str(value);
    }
    body.into_bytes()
}

pub fn requestinfo(kind: &str) -> Vec<u8> {
    format!("requestinfo {kind}").into_bytes()
}

pub fn addme() -> Vec<u8> {
    b"addme".to_vec()
}

pub fn askface(num: u16) -> Vec<u8> {
    format!("askface {num}").into_bytes()
}

pub fn apply(tag: u32) -> Vec<u8> {
    format!("apply {tag}").into_bytes()
}

pub fn examine(tag: u32) -> Vec<u8> {
    format!("examine {tag}").into_bytes()
}

pub fn mark(tag: u32) -> Vec<u8> {
    let mut body = b"mark ".to_vec();
    body.extend_from_slice(&tag.to_be_bytes());
    body
}

pub fn lock(locked: bool, tag: u32) -> Vec<u8> {
    let mut body = b"lock ".to_vec();
    body.push(u8::from(locked));
    body.extend_from_slice(&tag.to_be_bytes());
    body
}

pub fn lookat(dx: i32, dy: i32) -> Vec<u8> {
    format!("lookat {dx} {dy}").into_bytes()
}

pub fn move_item(to: u32, tag: u32, nrof: u32) -> Vec<u8> {
    format!("move {to} {tag} {nrof}").into_bytes()
}

pub fn reply(text: &str) -> Vec<u8> {
    format!("reply {text}").into_bytes()
}

pub fn mapredraw() -> Vec<u8> {
    b"mapredraw".to_vec()
}

/// `ncom` body: binary packet id and repeat count, then the command text.
/// The packet id is owned by the writer so acknowledgements can be matched.
pub fn ncom(packet: u16, repeat: u32, command: &str) -> Vec<u8> {
    let mut body = b"ncom ".to_vec();
    body.extend_from_slice(&packet.to_be_bytes());
    body.extend_from_slice(&repeat.to_be_bytes());
    body.extend_from_slice(command.as_bytes());
    body
}
