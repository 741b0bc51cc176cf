//! The ledger path scheme.
//!
//! All TrustMesh state lives under a small set of well-known prefixes:
//!
//! | Path | Contents |
//! |------|----------|
//! | `reputation/{agent}/current` | Latest signed reputation record |
//! | `reputation/{agent}/history/{ts}` | Archived prior versions |
//! | `sessions/{session_id}` | Published session record |
//! | `sessions/by-agent/{agent}/{ts}/{session_id}` | Pointer for per-agent listing |
//! | `disputes/{session_id}` | Dispute record for a contested session |

use chrono::{DateTime, Utc};

/// Path of an agent's current reputation record.
pub fn reputation_current(agent_id: &str) -> String {
    format!("reputation/{agent_id}/current")
}

/// History path for an archived reputation version.
///
/// Timestamps are RFC 3339 in UTC so lexicographic listing is also
/// chronological.
pub fn reputation_history(agent_id: &str, archived_at: DateTime<Utc>) -> String {
    format!(
        "reputation/{agent_id}/history/{}",
        archived_at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
    )
}

/// Prefix covering an agent's full reputation history.
pub fn reputation_history_prefix(agent_id: &str) -> String {
    format!("reputation/{agent_id}/history/")
}

/// Path of a published session record.
pub fn session(session_id: &str) -> String {
    format!("sessions/{session_id}")
}

/// Per-agent session pointer, for listing an agent's sessions without a
/// full ledger scan. The payload is the session path itself.
///
/// The key embeds the session's creation timestamp ahead of its id, so a
/// lexicographic listing of an agent's pointers is also chronological and
/// a suffix of it is the agent's most recent sessions.
pub fn session_by_agent(agent_id: &str, created_at: DateTime<Utc>, session_id: &str) -> String {
    format!(
        "sessions/by-agent/{agent_id}/{}/{session_id}",
        created_at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
    )
}

/// Prefix covering one agent's session pointers.
pub fn session_by_agent_prefix(agent_id: &str) -> String {
    format!("sessions/by-agent/{agent_id}/")
}

/// Path of the dispute record attached to a session.
pub fn dispute(session_id: &str) -> String {
    format!("disputes/{session_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_layout() {
        let t = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(reputation_current("a1"), "reputation/a1/current");
        assert_eq!(session("s1"), "sessions/s1");
        assert_eq!(
            session_by_agent("a1", t, "s1"),
            "sessions/by-agent/a1/2026-01-01T00:00:00.000000Z/s1"
        );
        assert_eq!(dispute("s1"), "disputes/s1");
    }

    #[test]
    fn test_by_agent_pointers_sort_by_creation_time() {
        let t1 = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let t2 = DateTime::parse_from_rfc3339("2026-01-02T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        // Session ids would sort the other way; the timestamp decides.
        let older = session_by_agent("a", t1, "zzz");
        let newer = session_by_agent("a", t2, "aaa");
        assert!(older < newer);
        assert!(older.starts_with(&session_by_agent_prefix("a")));
    }

    #[test]
    fn test_history_paths_sort_chronologically() {
        let t1 = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let t2 = DateTime::parse_from_rfc3339("2026-01-02T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let p1 = reputation_history("a", t1);
        let p2 = reputation_history("a", t2);
        assert!(p1 < p2);
        assert!(p1.starts_with(&reputation_history_prefix("a")));
    }
}
