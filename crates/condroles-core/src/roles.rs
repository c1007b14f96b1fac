//! Role markup for resolved conditionals.

use std::collections::BTreeSet;

/// Closes an inline role span opened by [`RoleFormat::inline_open`].
pub const INLINE_CLOSE: &str = "#";

/// How value tokens become role names.
///
/// With an attribute configured, value `azure` becomes the role
/// `platform:azure`; without one the value is the role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleFormat {
    attribute: Option<String>,
}

impl RoleFormat {
    #[must_use]
    pub fn new(attribute: Option<String>) -> Self {
        Self { attribute }
    }

    #[must_use]
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Role name for a single value.
    #[must_use]
    pub fn role(&self, value: &str) -> String {
        match &self.attribute {
            Some(attribute) => format!("{attribute}:{value}"),
            None => value.to_owned(),
        }
    }

    /// Role names in value order.
    fn roles<'v>(&'v self, values: &'v BTreeSet<String>) -> impl Iterator<Item = String> + 'v {
        values.iter().map(move |value| self.role(value))
    }

    /// `.r1.r2`
    #[must_use]
    pub fn dotted(&self, values: &BTreeSet<String>) -> String {
        self.roles(values).map(|role| format!(".{role}")).collect()
    }

    /// `role="r1 r2"`
    #[must_use]
    pub fn assignment(&self, values: &BTreeSet<String>) -> String {
        let roles: Vec<String> = self.roles(values).collect();
        format!("role=\"{}\"", roles.join(" "))
    }

    /// `[.r1.r2]#`, to be closed with [`INLINE_CLOSE`].
    #[must_use]
    pub fn inline_open(&self, values: &BTreeSet<String>) -> String {
        format!("[{}]#", self.dotted(values))
    }

    /// A fresh block attribute line: `[role="r1 r2"]`.
    #[must_use]
    pub fn attribute_line(&self, values: &BTreeSet<String>) -> String {
        format!("[{}]", self.assignment(values))
    }

    /// Add the roles to an existing block attribute line.
    ///
    /// Returns `None` for anchor lines (`[[id]]`), which cannot carry a role;
    /// a fresh attribute line belongs above them instead.
    #[must_use]
    pub fn attach(&self, line: &str, values: &BTreeSet<String>) -> Option<String> {
        if line.starts_with("[[") {
            return None;
        }
        let inner = line.strip_prefix('[')?.strip_suffix(']')?;
        if inner.trim().is_empty() {
            return Some(self.attribute_line(values));
        }
        // Shorthand role lists take more roles in the same form.
        if inner.starts_with('.') && !inner.contains([',', '=', '"']) {
            return Some(format!("[{inner}{}]", self.dotted(values)));
        }
        Some(format!("[{inner},{}]", self.assignment(values)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(tokens: &[&str]) -> BTreeSet<String> {
        tokens.iter().map(|t| (*t).to_owned()).collect()
    }

    #[test]
    fn test_roles_with_attribute() {
        let format = RoleFormat::new(Some("platform".to_owned()));
        let set = values(&["azure", "aws"]);
        assert_eq!(format.role("azure"), "platform:azure");
        assert_eq!(format.dotted(&set), ".platform:aws.platform:azure");
        assert_eq!(format.assignment(&set), r#"role="platform:aws platform:azure""#);
    }

    #[test]
    fn test_roles_without_attribute() {
        let format = RoleFormat::default();
        let set = values(&["azure"]);
        assert_eq!(format.inline_open(&set), "[.azure]#");
        assert_eq!(format.attribute_line(&set), r#"[role="azure"]"#);
    }

    #[test]
    fn test_attach_to_attribute_lines() {
        let format = RoleFormat::new(Some("platform".to_owned()));
        let set = values(&["azure"]);
        assert_eq!(
            format.attach("[source,bash]", &set).as_deref(),
            Some(r#"[source,bash,role="platform:azure"]"#)
        );
        assert_eq!(
            format.attach("[]", &set).as_deref(),
            Some(r#"[role="platform:azure"]"#)
        );
        assert_eq!(
            format.attach("[.lead]", &set).as_deref(),
            Some("[.lead.platform:azure]")
        );
        assert_eq!(format.attach("[[anchor]]", &set), None);
        assert_eq!(format.attach("not an attribute line", &set), None);
    }
}
