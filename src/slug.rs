//! Slug derivation for notes submitted without an explicit slug.

/// Latin spelling of a lowercase Cyrillic letter, if it has one.
fn transliterate(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "j",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        'і' => "i",
        'ї' => "yi",
        'є' => "ye",
        'ґ' => "g",
        _ => return None,
    };
    Some(latin)
}

/// Turns free text into a URL-safe slug.
///
/// Cyrillic is transliterated, everything is lowercased, characters outside
/// `[a-z0-9_-]` and whitespace are dropped, and runs of whitespace or hyphens
/// collapse into a single `-`. The result never starts or ends with `-`.
pub fn slugify(text: &str) -> String {
    let mut latin = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        if let Some(t) = transliterate(c) {
            latin.push_str(t);
        } else if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c.is_whitespace() {
            latin.push(c);
        }
    }

    let mut slug = String::with_capacity(latin.len());
    let mut pending_dash = false;
    for c in latin.trim().chars() {
        if c == '-' || c.is_whitespace() {
            pending_dash = true;
            continue;
        }
        if pending_dash && !slug.is_empty() {
            slug.push('-');
        }
        pending_dash = false;
        slug.push(c);
    }
    slug
}

/// Whether `slug` only uses characters allowed in URL slugs.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Truncates to at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
