use super::*;
use crate::ticket::{Lineage, TicketKind};
use chrono::TimeZone;
use proptest::prelude::*;

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn at(offset: Duration) -> DateTime<Utc> {
    epoch() + chrono::Duration::from_std(offset).unwrap()
}

fn ticket(kind: TicketKind, policy: ExpirationPolicy) -> Ticket {
    Ticket::new(format!("{}-test", kind.default_prefix()), kind, policy, epoch())
}

fn descendant_of(parent: Ticket, standalone: ExpirationPolicy, mode: CascadeMode) -> Ticket {
    let mut child = ticket(TicketKind::Service, ExpirationPolicy::descendant(standalone))
        .with_parent(parent.id().to_string());
    child.attach_lineage(Lineage::new(parent, mode));
    child
}

const MS: Duration = Duration::from_millis(1);

#[test]
fn test_never_expires() {
    let t = ticket(TicketKind::TicketGranting, ExpirationPolicy::never());
    assert!(!t.is_expired_at(at(Duration::from_secs(u32::MAX.into()))));
}

#[test]
fn test_hard_timeout_boundary() {
    let ttl = Duration::from_secs(60);
    let t = ticket(TicketKind::TransientSession, ExpirationPolicy::hard_timeout(ttl));
    assert!(!t.is_expired_at(at(ttl - MS)));
    assert!(!t.is_expired_at(at(ttl)));
    assert!(t.is_expired_at(at(ttl + MS)));
}

#[test]
fn test_idle_timeout_resets_on_use() {
    let idle = Duration::from_secs(30);
    let mut t = ticket(TicketKind::TicketGranting, ExpirationPolicy::idle_timeout(idle));
    t.update_at(at(Duration::from_secs(20)));
    assert!(!t.is_expired_at(at(Duration::from_secs(45))));
    assert!(t.is_expired_at(at(Duration::from_secs(50)) + chrono::Duration::milliseconds(1)));
}

#[test]
fn test_timeout_hard_limit_wins_over_activity() {
    let mut t = ticket(
        TicketKind::TicketGranting,
        ExpirationPolicy::timeout(Duration::from_secs(100), Duration::from_secs(30)),
    );
    for step in 1..=5 {
        t.update_at(at(Duration::from_secs(step * 20)));
    }
    assert!(t.is_expired_at(at(Duration::from_secs(101))));
}

#[test]
fn test_multi_use_expires_on_count() {
    let mut t = ticket(
        TicketKind::Service,
        ExpirationPolicy::multi_use(2, Duration::from_secs(10)),
    );
    assert!(!t.is_expired_at(epoch()));
    t.update_at(at(Duration::from_secs(1)));
    assert!(!t.is_expired_at(at(Duration::from_secs(1))));
    t.update_at(at(Duration::from_secs(2)));
    assert!(t.is_expired_at(at(Duration::from_secs(2))));
}

#[test]
fn test_multi_use_expires_on_time() {
    let t = ticket(
        TicketKind::Service,
        ExpirationPolicy::multi_use(5, Duration::from_secs(10)),
    );
    assert!(!t.is_expired_at(at(Duration::from_secs(10))));
    assert!(t.is_expired_at(at(Duration::from_secs(10) + MS)));
}

#[test]
fn test_expiry_is_a_ratchet() {
    let mut t = ticket(
        TicketKind::Service,
        ExpirationPolicy::multi_use(1, Duration::from_secs(10)),
    );
    t.update_at(at(Duration::from_secs(1)));
    assert!(t.is_expired_at(at(Duration::from_secs(1))));
    t.update_at(at(Duration::from_secs(2)));
    assert!(t.is_expired_at(at(Duration::from_secs(2))));

    let mut killed = ticket(TicketKind::TicketGranting, ExpirationPolicy::never());
    killed.mark_expired();
    killed.update_at(at(Duration::from_secs(1)));
    assert!(killed.is_expired_at(at(Duration::from_secs(1))));
}

#[test]
fn test_dependent_descendant_expires_with_parent() {
    let mut parent = ticket(TicketKind::TicketGranting, ExpirationPolicy::never());
    parent.mark_expired();
    let child = descendant_of(
        parent,
        ExpirationPolicy::multi_use(1, Duration::from_secs(10)),
        CascadeMode::Dependent,
    );
    assert!(child.is_expired_at(epoch()));
}

#[test]
fn test_sovereign_descendant_outlives_parent() {
    let mut parent = ticket(TicketKind::TicketGranting, ExpirationPolicy::never());
    parent.mark_expired();
    let child = descendant_of(
        parent,
        ExpirationPolicy::multi_use(1, Duration::from_secs(10)),
        CascadeMode::Sovereign,
    );
    assert!(!child.is_expired_at(epoch()));
    assert!(child.is_expired_at(at(Duration::from_secs(11))));
}

#[test]
fn test_orphaned_lineage_counts_as_expired_parent() {
    let mut child = ticket(
        TicketKind::Service,
        ExpirationPolicy::descendant(ExpirationPolicy::never()),
    )
    .with_parent("TGT-gone");
    assert!(!child.is_expired_at(epoch()));

    child.attach_lineage(Lineage::orphaned(CascadeMode::Dependent));
    assert!(child.is_expired_at(epoch()));

    child.attach_lineage(Lineage::orphaned(CascadeMode::Sovereign));
    assert!(!child.is_expired_at(epoch()));
}

#[test]
fn test_cascade_follows_grandparent() {
    let grandparent = ticket(
        TicketKind::TicketGranting,
        ExpirationPolicy::hard_timeout(Duration::from_secs(60)),
    );
    let mut parent = ticket(
        TicketKind::ProxyGranting,
        ExpirationPolicy::descendant(ExpirationPolicy::never()),
    );
    parent.attach_lineage(Lineage::new(grandparent, CascadeMode::Dependent));
    let child = descendant_of(parent, ExpirationPolicy::never(), CascadeMode::Dependent);

    assert!(!child.is_expired_at(at(Duration::from_secs(60))));
    assert!(child.is_expired_at(at(Duration::from_secs(61))));
}

#[test]
fn test_maximum_lifetime() {
    assert_eq!(ExpirationPolicy::never().maximum_lifetime(), None);
    assert_eq!(
        ExpirationPolicy::timeout(Duration::from_secs(100), Duration::from_secs(10))
            .maximum_lifetime(),
        Some(Duration::from_secs(100))
    );
    assert_eq!(
        ExpirationPolicy::idle_timeout(Duration::from_secs(10)).maximum_lifetime(),
        Some(Duration::from_secs(10))
    );
    assert_eq!(
        ExpirationPolicy::descendant(ExpirationPolicy::multi_use(1, Duration::from_secs(5)))
            .maximum_lifetime(),
        Some(Duration::from_secs(5))
    );
}

#[test]
fn test_policy_serializes_as_tagged_millis() {
    let policy = ExpirationPolicy::descendant(ExpirationPolicy::multi_use(1, Duration::from_secs(10)));
    let json = serde_json::to_value(&policy).unwrap();
    assert_eq!(json["policy"], "descendant");
    assert_eq!(json["standalone"]["policy"], "multi_use");
    assert_eq!(json["standalone"]["time_to_live"], 10_000);

    let parsed: ExpirationPolicy = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, policy);
}

#[test]
fn test_cascade_mode_parsing() {
    assert_eq!("Dependent".parse::<CascadeMode>().unwrap(), CascadeMode::Dependent);
    assert_eq!(" sovereign ".parse::<CascadeMode>().unwrap(), CascadeMode::Sovereign);
    assert!("orphan".parse::<CascadeMode>().is_err());
}

proptest! {
    #[test]
    fn prop_hard_timeout_expires_strictly_after_limit(ttl_ms in 1u64..10_000_000, delta in 0u64..10_000) {
        let ttl = Duration::from_millis(ttl_ms);
        let t = ticket(TicketKind::TransientSession, ExpirationPolicy::hard_timeout(ttl));
        let before = ttl.saturating_sub(Duration::from_millis(delta));
        prop_assert!(!t.is_expired_at(at(before)));
        prop_assert!(t.is_expired_at(at(ttl + Duration::from_millis(delta + 1))));
    }
}
