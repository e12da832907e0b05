/// `singular` when `count` is one, otherwise `plural` or `singular` + "s".
pub fn pluralize(count: usize, singular: &str, plural: Option<&str>) -> String {
    if count == 1 {
        return singular.to_string();
    }

    match plural {
        Some(p) => p.to_string(),
        None => format!("{singular}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn irregular_plurals_are_respected() {
        assert_eq!(pluralize(1, "entry", Some("entries")), "entry");
        assert_eq!(pluralize(0, "entry", Some("entries")), "entries");
        assert_eq!(pluralize(3, "subject", None), "subjects");
    }
}
