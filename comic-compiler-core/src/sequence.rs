//! Derives the list of issue URLs from the URL of the first issue.

use crate::contract::IssueRequest;
use crate::error::SequenceError;

/// A seed URL split around its trailing issue number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuePattern {
    pub prefix: String,
    pub start_number: u32,
    /// Digit count of the seed's number; every generated number is padded to it.
    pub width: usize,
    pub suffix: String,
}

impl IssuePattern {
    pub fn parse(seed_url: &str) -> Result<Self, SequenceError> {
        let trimmed = seed_url.trim_end_matches('/');
        let suffix = &seed_url[trimmed.len()..];
        let digits = trimmed
            .bytes()
            .rev()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let not_found = || SequenceError::PatternNotFound {
            url: seed_url.to_string(),
        };
        if digits == 0 {
            return Err(not_found());
        }
        let split = trimmed.len() - digits;
        let start_number = trimmed[split..].parse::<u32>().map_err(|_| not_found())?;
        Ok(Self {
            prefix: trimmed[..split].to_string(),
            start_number,
            width: digits,
            suffix: suffix.to_string(),
        })
    }

    pub fn url_for(&self, issue_number: u32) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            issue_number,
            self.suffix,
            width = self.width
        )
    }

    /// Issues from the seed's number up to `end_number`, inclusive.
    pub fn issues(&self, end_number: u32) -> Vec<IssueRequest> {
        (self.start_number..=end_number)
            .map(|n| IssueRequest {
                issue_number: n,
                resolved_url: self.url_for(n),
            })
            .collect()
    }
}

/// Parse `seed_url` and generate every issue up to `end_number`.
///
/// An `end_number` below the seed's own number yields an empty list.
pub fn resolve(seed_url: &str, end_number: u32) -> Result<Vec<IssueRequest>, SequenceError> {
    Ok(IssuePattern::parse(seed_url)?.issues(end_number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_padding_and_trailing_slash() {
        let issues = resolve("https://grabber.zone/comics/sonic-idw/sonic-the-hedgehog-05/", 7)
            .expect("pattern");
        let urls: Vec<_> = issues.iter().map(|i| i.resolved_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://grabber.zone/comics/sonic-idw/sonic-the-hedgehog-05/",
                "https://grabber.zone/comics/sonic-idw/sonic-the-hedgehog-06/",
                "https://grabber.zone/comics/sonic-idw/sonic-the-hedgehog-07/",
            ]
        );
        assert_eq!(
            issues.iter().map(|i| i.issue_number).collect::<Vec<_>>(),
            vec![5, 6, 7]
        );
    }

    #[test]
    fn count_matches_range() {
        let issues = resolve("https://example.com/series/issue-001", 120).unwrap();
        assert_eq!(issues.len(), 120);
        assert_eq!(issues[0].resolved_url, "https://example.com/series/issue-001");
        assert_eq!(issues[99].resolved_url, "https://example.com/series/issue-100");
        assert_eq!(issues[119].resolved_url, "https://example.com/series/issue-120");
    }

    #[test]
    fn numbers_wider_than_padding_grow() {
        let issues = resolve("https://example.com/c-9/", 11).unwrap();
        let urls: Vec<_> = issues.into_iter().map(|i| i.resolved_url).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/c-9/",
                "https://example.com/c-10/",
                "https://example.com/c-11/",
            ]
        );
    }

    #[test]
    fn end_before_start_is_empty() {
        let issues = resolve("https://example.com/comic-12/", 3).expect("not an error");
        assert!(issues.is_empty());
    }

    #[test]
    fn missing_number_is_pattern_not_found() {
        let err = resolve("https://example.com/comic/", 3).unwrap_err();
        assert_eq!(
            err,
            SequenceError::PatternNotFound {
                url: "https://example.com/comic/".into()
            }
        );
    }

    #[test]
    fn parse_exposes_template_parts() {
        let pattern = IssuePattern::parse("https://example.com/book-0042//").unwrap();
        assert_eq!(pattern.prefix, "https://example.com/book-");
        assert_eq!(pattern.start_number, 42);
        assert_eq!(pattern.width, 4);
        assert_eq!(pattern.suffix, "//");
    }

    #[test]
    fn oversized_number_is_rejected() {
        assert!(IssuePattern::parse("https://example.com/c-99999999999999").is_err());
    }
}
