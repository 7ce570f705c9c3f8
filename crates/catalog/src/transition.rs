use fusion_protocol::GameStatus;

/// Whether a game may move from `from` to `to` in one step.
///
/// The lifecycle is `NotInstalled -> Downloading -> Installing -> Installed
/// -> Uninstalling -> NotInstalled`. `Downloading -> Installed` is also
/// accepted: some storefronts unpack in place and never report an
/// installing step.
pub fn can_transition(from: GameStatus, to: GameStatus) -> bool {
    use GameStatus::*;

    matches!(
        (from, to),
        (NotInstalled, Downloading)
            | (Downloading, Installing)
            | (Downloading, Installed)
            | (Installing, Installed)
            | (Installed, Uninstalling)
            | (Uninstalling, NotInstalled)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_protocol::GameStatus::*;

    #[test]
    fn lifecycle_edges_are_allowed() {
        assert!(can_transition(NotInstalled, Downloading));
        assert!(can_transition(Downloading, Installing));
        assert!(can_transition(Installing, Installed));
        assert!(can_transition(Installed, Uninstalling));
        assert!(can_transition(Uninstalling, NotInstalled));
    }

    #[test]
    fn in_place_install_skips_installing() {
        assert!(can_transition(Downloading, Installed));
    }

    #[test]
    fn other_edges_are_rejected() {
        assert!(!can_transition(NotInstalled, Installed));
        assert!(!can_transition(Installed, Downloading));
        assert!(!can_transition(Installed, NotInstalled));
        assert!(!can_transition(Uninstalling, Installed));
        assert!(!can_transition(Installing, Downloading));
        assert!(!can_transition(NotInstalled, Uninstalling));
    }

    #[test]
    fn self_transitions_are_not_edges() {
        for s in [NotInstalled, Downloading, Installing, Installed, Uninstalling] {
            assert!(!can_transition(s, s));
        }
    }
}
