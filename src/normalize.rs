use anyhow::Context as _;

/// Substitutions applied before the ASCII strip. The source site decorates chapter
/// text with a handful of typographic glyphs that read fine as plain ASCII.
static SUBSTITUTIONS: &[(char, &str)] = &[
    ('\u{2013}', "-"),    // en dash
    ('\u{2014}', "-"),    // em dash
    ('\u{201C}', "\""),   // left curly double quote
    ('\u{201D}', "\""),   // right curly double quote
    ('\u{2019}', "'"),    // right curly single quote
    ('\u{2153}', "1/3"),  // vulgar fraction one third
];

/// Decodes a fetched body as UTF-8 and normalizes it down to ASCII. A body that is
/// not valid UTF-8 is a hard error; there is no recovery path for it.
pub fn normalize_bytes(raw: &[u8]) -> anyhow::Result<String> {
    let text = std::str::from_utf8(raw).context("decode body as utf-8")?;
    Ok(normalize_str(text))
}

/// Applies the substitution table, then drops every remaining character with a code
/// point of 127 or above. The result is always valid ASCII.
pub fn normalize_str(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match SUBSTITUTIONS.iter().find(|(from, _)| *from == ch) {
            Some((_, replacement)) => out.push_str(replacement),
            None if (ch as u32) < 127 => out.push(ch),
            None => {}
        }
    }
    out
}

/// ASCII strip without the substitution table, used for chapter display titles.
pub fn strip_non_ascii(input: &str) -> String {
    input.chars().filter(|ch| (*ch as u32) < 127).collect()
}
