use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emphasis {
    /// Ceiling below 500 ft or visibility below 1 SM.
    Lifr,
    /// Ceiling 500-999 ft or visibility 1 to under 3 SM.
    Ifr,
    /// Ceiling 1000-3000 ft or visibility 3-5 SM.
    Mvfr,
    Hazard,
    Altimeter,
    Runway,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fragment<'a> {
    pub text: &'a str,
    pub emphasis: Option<Emphasis>,
}

const PATTERNS: [(Emphasis, &str); 6] = [
    (
        Emphasis::Hazard,
        r"(?:[+-]|\b)(?:VC)?TS(?:RA|GR|GS|SN|PL)?\b|\bFZ(?:RA|DZ|FG)\b|\bLLWS\b|\bWIND ?SHEAR\b",
    ),
    (
        Emphasis::Lifr,
        r"\b(?:BKN|OVC|VV)00[0-4]\b|\bM?(?:1/4|1/2|3/4|0)SM\b",
    ),
    (
        Emphasis::Ifr,
        r"\b(?:BKN|OVC|VV)00[5-9]\b|\b(?:1 1/4|1 1/2|1 3/4|2 1/2|1|2)SM\b",
    ),
    (
        Emphasis::Mvfr,
        r"\b(?:BKN|OVC|VV)0(?:1\d|2\d|30)\b|\b[345]SM\b",
    ),
    (Emphasis::Altimeter, r"\bA[23]\d{3}\b"),
    (
        Emphasis::Runway,
        r"\b(?:RWYS?|RUNWAYS?)\s+\d{1,2}[LRC]?\b",
    ),
];

fn rules() -> &'static [(Emphasis, Regex)] {
    static RULES: OnceLock<Vec<(Emphasis, Regex)>> = OnceLock::new();
    RULES.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|(emphasis, pattern)| match Regex::new(pattern) {
                Ok(re) => Some((*emphasis, re)),
                Err(err) => {
                    warn!("highlight pattern rejected: {err}");
                    None
                }
            })
            .collect()
    })
}

/// Split raw weather text into display fragments. Concatenating the fragment
/// texts always yields the input unchanged. Where rules overlap, the earliest
/// and then longest match wins.
pub fn highlight(text: &str) -> Vec<Fragment<'_>> {
    let mut matches: Vec<(usize, usize, Emphasis)> = Vec::new();
    for (emphasis, re) in rules() {
        for m in re.find_iter(text) {
            if !m.is_empty() {
                matches.push((m.start(), m.end(), *emphasis));
            }
        }
    }
    matches.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    let mut fragments = Vec::new();
    let mut cursor = 0usize;
    for (start, end, emphasis) in matches {
        if start < cursor {
            continue;
        }
        if start > cursor {
            fragments.push(Fragment {
                text: &text[cursor..start],
                emphasis: None,
            });
        }
        fragments.push(Fragment {
            text: &text[start..end],
            emphasis: Some(emphasis),
        });
        cursor = end;
    }
    if cursor < text.len() {
        fragments.push(Fragment {
            text: &text[cursor..],
            emphasis: None,
        });
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::{highlight, Emphasis};

    fn emphasized(text: &str) -> Vec<(String, Emphasis)> {
        highlight(text)
            .into_iter()
            .filter_map(|f| f.emphasis.map(|e| (f.text.to_string(), e)))
            .collect()
    }

    #[test]
    fn fragments_reassemble_input() {
        let metar = "KEWR 171751Z 22012G22KT 1/2SM +TSRA OVC003 18/17 A2992 RMK AO2";
        let joined: String = highlight(metar).iter().map(|f| f.text).collect();
        assert_eq!(joined, metar);
    }

    #[test]
    fn flight_categories_and_hazards() {
        let found = emphasized("KEWR 171751Z 22012KT 1/2SM +TSRA OVC003 A2992");
        assert_eq!(
            found,
            vec![
                ("1/2SM".to_string(), Emphasis::Lifr),
                ("+TSRA".to_string(), Emphasis::Hazard),
                ("OVC003".to_string(), Emphasis::Lifr),
                ("A2992".to_string(), Emphasis::Altimeter),
            ]
        );
    }

    #[test]
    fn mixed_visibility_prefers_longest() {
        let found = emphasized("KORD 1 1/2SM BR BKN007 VCTS");
        assert_eq!(
            found,
            vec![
                ("1 1/2SM".to_string(), Emphasis::Ifr),
                ("BKN007".to_string(), Emphasis::Ifr),
                ("VCTS".to_string(), Emphasis::Hazard),
            ]
        );
    }

    #[test]
    fn marginal_and_runways() {
        let found = emphasized("LDG RWY 22L. DEPG RWYS 22R. 4SM HZ BKN025 LLWS");
        assert_eq!(
            found,
            vec![
                ("RWY 22L".to_string(), Emphasis::Runway),
                ("RWYS 22R".to_string(), Emphasis::Runway),
                ("4SM".to_string(), Emphasis::Mvfr),
                ("BKN025".to_string(), Emphasis::Mvfr),
                ("LLWS".to_string(), Emphasis::Hazard),
            ]
        );
    }

    #[test]
    fn clear_weather_is_plain() {
        assert!(emphasized("KJFK 171751Z 31008KT 10SM FEW250 21/08").is_empty());
        assert!(highlight("").is_empty());
    }
}
