use super::*;
use crate::authentication::Principal;
use crate::catalog::TicketDefinition;
use crate::expiration::ExpirationPolicy;
use chrono::TimeZone;
use std::time::Duration;

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn secs(n: i64) -> DateTime<Utc> {
    epoch() + chrono::Duration::seconds(n)
}

fn factory(mode: CascadeMode) -> DefaultTicketFactory {
    let catalog = TicketCatalog::with_defaults(mode).unwrap();
    DefaultTicketFactory::new(Arc::new(catalog)).unwrap()
}

fn authentication() -> Authentication {
    Authentication::new(Principal::new("casuser"))
}

fn service() -> Service {
    Service::new("https://app.example.org")
}

#[test]
fn test_ticket_granting_ticket_uses_catalog_prefix_and_policy() {
    let factory = factory(CascadeMode::Dependent);
    let tgt = factory.ticket_granting().create_at(authentication(), epoch());

    assert!(tgt.id().starts_with("TGT-"));
    assert_eq!(tgt.kind(), TicketKind::TicketGranting);
    assert_eq!(tgt.principal_id(), Some("casuser"));
    assert_eq!(tgt.creation_time(), epoch());
    assert_eq!(tgt.expiration_policy().name(), "timeout");
    assert!(tgt.parent_id().is_none());
}

#[test]
fn test_service_ticket_records_descendant_and_uses_parent() {
    let factory = factory(CascadeMode::Dependent);
    let mut tgt = factory.ticket_granting().create_at(authentication(), epoch());

    let st = factory
        .service()
        .create_at(&mut tgt, service(), false, secs(5))
        .unwrap();

    assert!(st.id().starts_with("ST-"));
    assert_eq!(st.parent_id(), Some(tgt.id()));
    assert!(tgt.descendants().contains(st.id()));
    assert_eq!(tgt.count_of_uses(), 1);
    assert_eq!(tgt.last_time_used(), secs(5));
    assert_eq!(st.parent().unwrap().id(), tgt.id());
    assert!(st.is_from_new_login());

    let second = factory
        .service()
        .create_at(&mut tgt, service(), false, secs(6))
        .unwrap();
    assert!(!second.is_from_new_login());
    assert_eq!(tgt.descendants().len(), 2);
}

#[test]
fn test_expired_parent_is_rejected() {
    let factory = factory(CascadeMode::Dependent);
    let mut tgt = factory.ticket_granting().create_at(authentication(), epoch());
    tgt.mark_expired();

    let error = factory
        .service()
        .create_at(&mut tgt, service(), true, secs(1))
        .unwrap_err();
    assert!(matches!(error, Error::InvalidTicket { .. }));
    assert!(tgt.descendants().is_empty());
}

#[test]
fn test_wrong_parent_kind_is_rejected() {
    let factory = factory(CascadeMode::Dependent);
    let mut tgt = factory.ticket_granting().create_at(authentication(), epoch());

    let error = factory
        .proxy()
        .create_at(&mut tgt, service(), secs(1))
        .unwrap_err();
    assert!(matches!(error, Error::InvalidTicket { .. }));
}

#[test]
fn test_proxy_chain_carries_full_lineage() {
    let factory = factory(CascadeMode::Dependent);
    let mut tgt = factory.ticket_granting().create_at(authentication(), epoch());
    let mut pgt = factory
        .proxy_granting()
        .create_at(&mut tgt, authentication(), secs(1))
        .unwrap();
    let pt = factory
        .proxy()
        .create_at(&mut pgt, service(), secs(2))
        .unwrap();

    let ancestors: Vec<TicketKind> = pt.ancestors().map(Ticket::kind).collect();
    assert_eq!(
        ancestors,
        vec![TicketKind::ProxyGranting, TicketKind::TicketGranting]
    );
    assert!(pgt.descendants().contains(pt.id()));
}

#[test]
fn test_refresh_token_dies_with_session_when_dependent() {
    let factory = factory(CascadeMode::Dependent);
    let mut tgt = factory.ticket_granting().create_at(authentication(), epoch());
    let mut at = factory
        .oauth_access_token()
        .create_at(&mut tgt, service(), ["openid".to_string()].into(), secs(1))
        .unwrap();
    let mut rt = factory
        .oauth_refresh_token()
        .create_at(&mut at, BTreeSet::new(), secs(2))
        .unwrap();

    assert!(rt.scopes().contains("openid"));
    assert!(!rt.is_expired_at(secs(3)));

    let mut expired_tgt = tgt.clone();
    expired_tgt.mark_expired();
    let mut expired_at = at.clone();
    expired_at.attach_lineage(Lineage::new(expired_tgt, CascadeMode::Dependent));
    rt.attach_lineage(Lineage::new(expired_at, CascadeMode::Dependent));
    assert!(rt.is_expired_at(secs(3)));
}

#[test]
fn test_refresh_token_survives_session_when_sovereign() {
    let factory = factory(CascadeMode::Sovereign);
    let mut tgt = factory.ticket_granting().create_at(authentication(), epoch());
    let mut at = factory
        .oauth_access_token()
        .create_at(&mut tgt, service(), BTreeSet::new(), secs(1))
        .unwrap();
    let rt = factory
        .oauth_refresh_token()
        .create_at(&mut at, BTreeSet::new(), secs(2))
        .unwrap();

    tgt.mark_expired();
    let mut rt = rt;
    let mut detached_at = at.clone();
    detached_at.attach_lineage(Lineage::new(tgt, CascadeMode::Sovereign));
    rt.attach_lineage(Lineage::new(detached_at, CascadeMode::Sovereign));
    assert!(!rt.is_expired_at(secs(3)));
}

#[test]
fn test_transient_session_ticket_is_rootless() {
    let factory = factory(CascadeMode::Dependent);
    let mut properties = Properties::new();
    properties.insert("relay_state".to_string(), serde_json::json!("abc"));

    let tst = factory
        .transient_session()
        .create_at(None, properties, epoch());
    assert!(tst.id().starts_with("TST-"));
    assert!(tst.parent_id().is_none());
    assert!(tst.lineage().is_none());
    assert_eq!(tst.property("relay_state"), Some(&serde_json::json!("abc")));
    assert!(!tst.is_expired_at(secs(300)));
    assert!(tst.is_expired_at(secs(301)));
}

#[test]
fn test_dispatch_by_request() {
    let factory = factory(CascadeMode::Dependent);
    let mut tgt = factory
        .create_at(
            TicketRequest::TicketGranting {
                authentication: authentication(),
            },
            epoch(),
        )
        .unwrap();

    let request = TicketRequest::OAuthCode {
        ticket_granting_ticket: &mut tgt,
        service: service(),
        scopes: BTreeSet::new(),
    };
    assert_eq!(request.kind(), TicketKind::OAuthCode);
    let code = factory.create_at(request, secs(1)).unwrap();

    assert!(code.id().starts_with("OC-"));
    assert_eq!(code.principal_id(), Some("casuser"));
    assert!(tgt.descendants().contains(code.id()));
}

#[test]
fn test_get_returns_factory_for_kind() {
    let factory = factory(CascadeMode::Dependent);
    for kind in TicketKind::ALL {
        let handle = factory.get(kind).as_factory();
        assert_eq!(handle.kind(), kind);
        assert_eq!(handle.definition().prefix(), kind.default_prefix());
    }
}

#[test]
fn test_missing_catalog_entry_fails_construction() {
    let catalog = TicketCatalog::builder()
        .register(TicketDefinition::new(TicketKind::TicketGranting))
        .build()
        .unwrap();
    let result = DefaultTicketFactory::new(Arc::new(catalog));
    assert!(matches!(result, Err(Error::Configuration { .. })));
}

#[test]
fn test_custom_definition_and_suffix() {
    let catalog = TicketKind::ALL
        .into_iter()
        .fold(TicketCatalog::builder(), |builder, kind| {
            builder.register(TicketDefinition::new(kind))
        })
        .register(
            TicketDefinition::new(TicketKind::Service)
                .with_prefix("SVC")
                .with_id_length(20)
                .with_policy(ExpirationPolicy::multi_use(3, Duration::from_secs(60))),
        )
        .build()
        .unwrap();
    let factory =
        DefaultTicketFactory::with_id_suffix(Arc::new(catalog), Some("node7")).unwrap();

    let mut tgt = factory.ticket_granting().create_at(authentication(), epoch());
    let st = factory
        .service()
        .create_at(&mut tgt, service(), true, secs(1))
        .unwrap();

    assert!(st.id().starts_with("SVC-"));
    assert!(st.id().ends_with("-node7"));
    assert_eq!(st.id().len(), "SVC-".len() + 20 + "-node7".len());
    assert_eq!(
        st.expiration_policy(),
        &ExpirationPolicy::multi_use(3, Duration::from_secs(60))
    );
}
