/// Heuristic stand-in for a trained random-string detector: classifies a
/// URL slug as "random" (an opaque id rather than a human-authored phrase).
/// Numbers count toward randomness, matching the upstream detector's
/// `allow_numbers=True` configuration.
pub fn is_random_string(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }

    let chunks: Vec<&str> = s.split(|c: char| !c.is_alphanumeric()).filter(|c| !c.is_empty()).collect();
    if chunks.is_empty() {
        return false;
    }

    // A long purely-numeric chunk reads as an opaque id (article numbers,
    // timestamps), not a word.
    if chunks.iter().any(|c| c.len() >= 4 && c.chars().all(|ch| ch.is_ascii_digit())) {
        return true;
    }

    let letters: String = s.chars().filter(|c| c.is_alphabetic()).flat_map(|c| c.to_lowercase()).collect();
    if letters.len() < 4 {
        // Too short to judge on letter shape alone; a mixed alnum blob of
        // this length (ids like "a1b2") still reads as opaque.
        return s.chars().any(|c| c.is_ascii_digit()) && s.chars().any(|c| c.is_alphabetic());
    }

    let vowel_count = letters.chars().filter(|c| "aeiou".contains(*c)).count();
    let vowel_ratio = vowel_count as f64 / letters.len() as f64;

    let mut max_consonant_run = 0usize;
    let mut run = 0usize;
    for c in letters.chars() {
        if "aeiou".contains(c) {
            run = 0;
        } else {
            run += 1;
            max_consonant_run = max_consonant_run.max(run);
        }
    }

    // English words rarely go below ~15% or above ~65% vowels, and rarely
    // string together 5+ consonants.
    vowel_ratio < 0.15 || vowel_ratio > 0.65 || max_consonant_run >= 5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_like_slugs_are_not_random() {
        assert!(!is_random_string("noticias-internacionales"));
        assert!(!is_random_string("world-news-today"));
        assert!(!is_random_string("election-results"));
    }

    #[test]
    fn opaque_ids_are_random() {
        assert!(is_random_string("a8f3k2x9z1"));
        assert!(is_random_string("xk4j2"));
        assert!(is_random_string("20240517"));
    }

    #[test]
    fn short_mixed_alnum_is_random() {
        assert!(is_random_string("a1b2"));
    }
}
