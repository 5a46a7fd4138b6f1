use crate::types::{TocEntry, TocGroup};
use crate::util::correct_country_name;

/// Alphabetical, first-letter-grouped listing of countries for the index.
///
/// Names go through the same correction as the normalizer, so the headings
/// match what the country pages show.
pub fn build_toc<I, C, N>(entries: I) -> Vec<TocGroup>
where
    I: IntoIterator<Item = (C, N)>,
    C: Into<String>,
    N: AsRef<str>,
{
    let mut sorted: Vec<TocEntry> = entries
        .into_iter()
        .map(|(code, name)| TocEntry {
            code: code.into(),
            name: correct_country_name(name.as_ref()),
        })
        .collect();
    sorted.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.code.cmp(&b.code))
    });

    let mut groups: Vec<TocGroup> = Vec::new();
    for entry in sorted {
        let letter = heading(&entry.name);
        match groups.last_mut() {
            Some(group) if group.letter == letter => group.entries.push(entry),
            _ => groups.push(TocGroup {
                letter,
                entries: vec![entry],
            }),
        }
    }
    groups
}

fn heading(name: &str) -> String {
    name.chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "#".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(groups: &[TocGroup]) -> Vec<&str> {
        groups.iter().map(|g| g.letter.as_str()).collect()
    }

    #[test]
    fn groups_by_first_letter_in_order() {
        let toc = build_toc([("fr", "France"), ("de", "Germany"), ("es", "Spain")]);
        assert_eq!(letters(&toc), vec!["D", "F", "S"]);
        assert_eq!(toc[0].entries[0].name, "Germany");
        assert_eq!(toc[1].entries[0].code, "fr");
        assert_eq!(toc[2].entries[0].name, "Spain");
    }

    #[test]
    fn entries_sharing_a_letter_stay_together_and_sorted() {
        let toc = build_toc([
            ("sk", "Slovakia"),
            ("fr", "France"),
            ("es", "Spain"),
            ("fi", "Finland"),
            ("se", "Sweden"),
        ]);
        assert_eq!(letters(&toc), vec!["F", "S"]);
        let s: Vec<&str> = toc[1].entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(s, vec!["Slovakia", "Spain", "Sweden"]);
    }

    #[test]
    fn names_are_corrected_before_grouping() {
        let toc = build_toc([("ci", "Cote_dIvoire"), ("ca", "Canada"), ("us", "united_States")]);
        assert_eq!(letters(&toc), vec!["C", "U"]);
        let c: Vec<&str> = toc[0].entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(c, vec!["Canada", "Côte d'Ivoire"]);
        assert_eq!(toc[1].entries[0].name, "united States");
    }

    #[test]
    fn empty_input_gives_no_groups() {
        let toc = build_toc(Vec::<(String, String)>::new());
        assert!(toc.is_empty());
    }
}
