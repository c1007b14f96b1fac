//! Conditional preprocessor directives: `ifdef`, `ifndef`, `ifeval`, `endif`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

/// `operator::target[body]trailing`
static CONDITIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(ifdef|ifndef|endif|ifeval)::([^\[\]]*)\[([^\]]*)\](.*)$").unwrap()
});

/// Directive keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `ifdef::attr[]`
    Ifdef,
    /// `ifndef::attr[]`
    Ifndef,
    /// `ifeval::[expression]`
    Ifeval,
    /// `endif::[]`
    Endif,
}

impl Operator {
    /// Keyword as written in the source.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ifdef => "ifdef",
            Self::Ifndef => "ifndef",
            Self::Ifeval => "ifeval",
            Self::Endif => "endif",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ifdef" => Ok(Self::Ifdef),
            "ifndef" => Ok(Self::Ifndef),
            "ifeval" => Ok(Self::Ifeval),
            "endif" => Ok(Self::Endif),
            other => Err(format!("unknown conditional operator: {other}")),
        }
    }
}

/// A line recognized as a conditional directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveLine {
    /// Directive keyword.
    pub operator: Operator,
    /// Text between `::` and `[` (the attribute expression for `ifdef`/`ifndef`).
    pub target: String,
    /// Text inside the brackets (the expression for `ifeval`, or the content of
    /// a single-line `ifdef`/`ifndef`).
    pub body: String,
}

impl DirectiveLine {
    /// True for `ifdef::attr[content]` forms that carry their content inline.
    #[must_use]
    pub fn is_single_line(&self) -> bool {
        matches!(self.operator, Operator::Ifdef | Operator::Ifndef)
            && !self.target.trim().is_empty()
            && !self.body.trim().is_empty()
    }

    /// The expression that decides the condition.
    ///
    /// `ifeval` keeps its expression inside the brackets; every other
    /// directive names its attributes before them.
    #[must_use]
    pub fn expression(&self) -> &str {
        match self.operator {
            Operator::Ifeval => &self.body,
            _ => &self.target,
        }
    }
}

/// Match a conditional directive line.
#[must_use]
pub fn match_conditional(line: &str) -> Option<DirectiveLine> {
    let caps = CONDITIONAL.captures(line)?;
    let operator = caps[1].parse().ok()?;
    Some(DirectiveLine {
        operator,
        target: caps[2].to_owned(),
        body: caps[3].to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_ifdef() {
        let d = match_conditional("ifdef::azure[]").unwrap();
        assert_eq!(d.operator, Operator::Ifdef);
        assert_eq!(d.target, "azure");
        assert_eq!(d.body, "");
        assert!(!d.is_single_line());
        assert_eq!(d.expression(), "azure");
    }

    #[test]
    fn test_match_ifndef_with_list() {
        let d = match_conditional("ifndef::azure,aws[]").unwrap();
        assert_eq!(d.operator, Operator::Ifndef);
        assert_eq!(d.expression(), "azure,aws");
    }

    #[test]
    fn test_match_ifeval_uses_body() {
        let d = match_conditional(r#"ifeval::["{rel}" == "4"]"#).unwrap();
        assert_eq!(d.operator, Operator::Ifeval);
        assert_eq!(d.expression(), r#""{rel}" == "4""#);
    }

    #[test]
    fn test_match_endif_forms() {
        assert_eq!(
            match_conditional("endif::[]").unwrap().operator,
            Operator::Endif
        );
        assert_eq!(match_conditional("endif::azure[]").unwrap().target, "azure");
        assert_eq!(match_conditional("endif::[azure]").unwrap().body, "azure");
    }

    #[test]
    fn test_single_line_form() {
        let d = match_conditional("ifdef::azure[Only on Azure.]").unwrap();
        assert!(d.is_single_line());
    }

    #[test]
    fn test_trailing_text_allowed() {
        assert!(match_conditional("ifdef::azure[] // note").is_some());
    }

    #[test]
    fn test_non_directives() {
        assert!(match_conditional("ifdef:azure[]").is_none());
        assert!(match_conditional(" ifdef::azure[]").is_none());
        assert!(match_conditional("ifdef::azure").is_none());
        assert!(match_conditional("Some text ifdef::azure[]").is_none());
    }

    #[test]
    fn test_operator_round_trip() {
        for op in [
            Operator::Ifdef,
            Operator::Ifndef,
            Operator::Ifeval,
            Operator::Endif,
        ] {
            assert_eq!(op.as_str().parse::<Operator>(), Ok(op));
        }
        assert!("ifelse".parse::<Operator>().is_err());
    }
}
