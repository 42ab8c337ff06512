//! Daily briefing: the plain-text document read out on the call
//!
//! A `Briefing` is built once per invocation from the sources' results and is
//! immutable afterwards. `render` produces the text the speech compiler
//! consumes: sections separated by blank lines, multi-line sections keep one
//! item per line.

pub mod aggregator;

pub use crate::providers::Section;
pub use aggregator::{Aggregator, Clock, FixedClock, SystemClock};

use chrono::{NaiveDateTime, Timelike};

pub const SIGN_OFF: &str = "That's your briefing.";

/// Separator between sections in the rendered text
pub const SECTION_BREAK: &str = "\n\n";

/// One included section and its final text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BriefingSection {
    pub section: Section,
    pub content: String,
}

impl BriefingSection {
    /// `"<Label>. <content>"`, or the label on its own line when the content
    /// spans several lines.
    pub fn render(&self) -> String {
        if self.content.contains('\n') {
            format!("{}.\n{}", self.section.label(), self.content)
        } else {
            format!("{}. {}", self.section.label(), self.content)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Briefing {
    header: String,
    sections: Vec<BriefingSection>,
}

impl Briefing {
    /// Apply the presentation policy to raw source results.
    ///
    /// Sections are emitted in `Section::ALL` order regardless of the order of
    /// `results`; a section is dropped when its content is not reportable.
    pub fn new<I>(now: NaiveDateTime, recipient: &str, results: I) -> Self
    where
        I: IntoIterator<Item = (Section, String)>,
    {
        let mut results: Vec<(Section, String)> = results.into_iter().collect();
        let mut sections = Vec::new();
        for section in Section::ALL {
            let Some(pos) = results.iter().position(|(s, _)| *s == section) else {
                continue;
            };
            let (_, content) = results.swap_remove(pos);
            let content = content.trim();
            if section.is_reportable(content) {
                sections.push(BriefingSection {
                    section,
                    content: content.to_string(),
                });
            }
        }
        Self {
            header: header_line(now, recipient),
            sections,
        }
    }

    /// Greeting and date line
    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn sections(&self) -> &[BriefingSection] {
        &self.sections
    }

    pub fn contains(&self, section: Section) -> bool {
        self.sections.iter().any(|s| s.section == section)
    }

    pub fn render(&self) -> String {
        let mut parts = Vec::with_capacity(self.sections.len() + 2);
        parts.push(self.header.clone());
        parts.extend(self.sections.iter().map(BriefingSection::render));
        parts.push(SIGN_OFF.to_string());
        parts.join(SECTION_BREAK)
    }
}

pub fn greeting_for_hour(hour: u32) -> &'static str {
    if hour < 12 {
        "Good morning"
    } else if hour < 17 {
        "Good afternoon"
    } else {
        "Good evening"
    }
}

/// "Good morning Joshua. Monday, October 19, 2026."
pub fn header_line(now: NaiveDateTime, recipient: &str) -> String {
    let greeting = greeting_for_hour(now.hour());
    let date = now.format("%A, %B %-d, %Y");
    match recipient.trim() {
        "" => format!("{}. {}.", greeting, date),
        name => format!("{} {}. {}.", greeting, name, date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(hour, 5, 0)
            .unwrap()
    }

    #[test]
    fn greeting_boundaries() {
        assert_eq!(greeting_for_hour(0), "Good morning");
        assert_eq!(greeting_for_hour(11), "Good morning");
        assert_eq!(greeting_for_hour(12), "Good afternoon");
        assert_eq!(greeting_for_hour(16), "Good afternoon");
        assert_eq!(greeting_for_hour(17), "Good evening");
        assert_eq!(greeting_for_hour(23), "Good evening");
    }

    #[test]
    fn header_with_and_without_name() {
        assert_eq!(
            header_line(at(8), "Joshua"),
            "Good morning Joshua. Monday, October 19, 2026."
        );
        assert_eq!(header_line(at(18), ""), "Good evening. Monday, October 19, 2026.");
    }

    #[test]
    fn renders_sections_in_order_and_applies_policy() {
        let briefing = Briefing::new(
            at(8),
            "Joshua",
            vec![
                (Section::Headlines, "Congress passes budget.\nStorm hits coast.".to_string()),
                (Section::Markets, "".to_string()),
                (Section::Reminders, "No active reminders".to_string()),
                (Section::Calendar, "Nothing scheduled".to_string()),
                (Section::Weather, "Weather unavailable".to_string()),
            ],
        );

        assert!(!briefing.contains(Section::Reminders));
        assert!(!briefing.contains(Section::Markets));
        assert_eq!(
            briefing.render(),
            "Good morning Joshua. Monday, October 19, 2026.\n\n\
             Weather. Weather unavailable\n\n\
             Calendar. Nothing scheduled\n\n\
             Headlines.\nCongress passes budget.\nStorm hits coast.\n\n\
             That's your briefing."
        );
    }

    #[test]
    fn missing_results_are_skipped() {
        let briefing = Briefing::new(at(13), "", vec![(Section::Markets, "Markets steady.".into())]);
        assert_eq!(
            briefing.render(),
            "Good afternoon. Monday, October 19, 2026.\n\nMarkets. Markets steady.\n\nThat's your briefing."
        );
    }
}
