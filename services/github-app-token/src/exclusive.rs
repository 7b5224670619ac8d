//! Mutually exclusive option groups
//!
//! Identity sources, key sources and repository selector sources are all
//! "pick one" groups. They share this check so each group reports absent,
//! single and conflicting choices the same way.

/// Outcome of checking an exclusive option group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice<T> {
    /// No option in the group was set
    Absent,
    /// Exactly one option was set
    One {
        /// Name of the option that was set
        option: &'static str,
        /// Its value
        value: T,
    },
    /// More than one option was set
    Conflict(Vec<&'static str>),
}

/// Pick the single populated option from a group of named candidates
pub fn choose<T, const N: usize>(candidates: [(&'static str, Option<T>); N]) -> Choice<T> {
    let mut chosen: Option<(&'static str, T)> = None;
    let mut names = Vec::new();

    for (option, value) in candidates {
        if let Some(value) = value {
            names.push(option);
            if chosen.is_none() {
                chosen = Some((option, value));
            }
        }
    }

    match chosen {
        None => Choice::Absent,
        Some(_) if names.len() > 1 => Choice::Conflict(names),
        Some((option, value)) => Choice::One { option, value },
    }
}
