//! A deliberately conservative SVG minifier: strips comments and drops
//! whitespace-only runs between tags. Markup inside text containers is
//! kept verbatim, since whitespace is rendered there.

const TEXT_CONTAINERS: &[&str] = &["text", "textPath", "tspan"];

pub fn minify(svg: &str) -> String {
    collapse(&strip_comments(svg))
}

fn strip_comments(svg: &str) -> String {
    let mut out = String::with_capacity(svg.len());
    let mut rest = svg;

    while let Some(start) = rest.find("<!--") {
        out.push_str(&rest[..start]);
        match rest[start..].find("-->") {
            Some(end) => rest = &rest[start + end + 3..],
            // An unterminated comment swallows the tail, same as a parser would.
            None => return out,
        }
    }

    out.push_str(rest);
    out
}

fn collapse(svg: &str) -> String {
    let mut out = String::with_capacity(svg.len());
    let mut text_depth = 0usize;
    let mut i = 0;

    while i < svg.len() {
        if svg.as_bytes()[i] == b'<' {
            let end = tag_end(svg.as_bytes(), i);
            let tag = &svg[i..end];

            match parse_tag(tag) {
                Tag::Open(name) if TEXT_CONTAINERS.contains(&name) => text_depth += 1,
                Tag::Close(name) if TEXT_CONTAINERS.contains(&name) => {
                    text_depth = text_depth.saturating_sub(1);
                }
                _ => {}
            }

            out.push_str(tag);
            i = end;
        } else {
            let next = svg[i..].find('<').map_or(svg.len(), |at| i + at);
            let content = &svg[i..next];

            if text_depth > 0 || !content.chars().all(char::is_whitespace) {
                out.push_str(content);
            }

            i = next;
        }
    }

    out
}

/// Index one past the closing `>` of the tag starting at `start`. A `>`
/// inside a quoted attribute value does not end the tag.
fn tag_end(bytes: &[u8], start: usize) -> usize {
    let mut quote: Option<u8> = None;
    let mut i = start;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => match quote {
                Some(q) if q == bytes[i] => quote = None,
                None => quote = Some(bytes[i]),
                Some(_) => {}
            },
            b'>' if quote.is_none() => return i + 1,
            _ => {}
        }
        i += 1;
    }

    bytes.len()
}

enum Tag<'a> {
    Open(&'a str),
    Close(&'a str),
    Other,
}

fn parse_tag(tag: &str) -> Tag<'_> {
    let inner = tag.strip_prefix('<').unwrap_or(tag);

    if let Some(name) = inner.strip_prefix('/') {
        let end = name
            .find(|c: char| c.is_whitespace() || c == '>')
            .unwrap_or(name.len());
        return Tag::Close(&name[..end]);
    }

    if inner.starts_with(['!', '?']) || tag.ends_with("/>") {
        return Tag::Other;
    }

    let end = inner
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(inner.len());
    Tag::Open(&inner[..end])
}
