//! Registrar behaviour through the public API.

use dtn_core::api::delivery::DeliveryError;
use dtn_core::{CoreConfig, RegistrarError};
use integration_test_utils::{bundle, eid, CoreHarness, RecordingCallback};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_of_one_sink_have_one_winner() {
    let harness = CoreHarness::default();
    let mut tasks = Vec::new();
    for _ in 0..16 {
        let registrar = harness.core.registrar().clone();
        tasks.push(tokio::spawn(async move { registrar.register("app").await }));
    }

    let mut winners = 0;
    for task in tasks {
        match task.await.expect("join") {
            Ok(_) => winners += 1,
            Err(err) => assert_eq!(
                err,
                RegistrarError::SinkAlreadyRegistered("app".to_string())
            ),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(harness.core.registrar().registration_count().await, 1);
}

#[tokio::test]
async fn wrong_cookie_is_rejected_without_side_effects() {
    let harness = CoreHarness::default();
    let registrar = harness.core.registrar();
    let cookie = registrar.register("app").await.expect("register");

    assert_eq!(
        registrar.unregister("app", "forged").await,
        Err(RegistrarError::BadCookie)
    );
    assert_eq!(registrar.is_registered("app").await, Ok(true));

    let outgoing = bundle("api:me/app", "dtn://peer/app", b"hi");
    assert_eq!(
        registrar.send_as("app", "forged", outgoing.clone()).await,
        Err(RegistrarError::BadCookie)
    );
    assert!(harness.dispatch.dispatched().is_empty());

    let callback = Arc::new(RecordingCallback::new());
    assert_eq!(
        registrar.set_active("app", "forged", callback).await,
        Err(RegistrarError::BadCookie)
    );
    let dump = registrar.dump_registrations().await;
    assert!(dump.to_string().contains("app PASSIVE"));

    registrar.send_as("app", &cookie, outgoing).await.expect("send");
    assert_eq!(harness.dispatch.dispatched().len(), 1);
}

#[tokio::test]
async fn stale_cookie_cannot_activate_a_reregistered_sink() {
    let harness = CoreHarness::default();
    let registrar = harness.core.registrar();
    let stale_cookie = registrar.register("app").await.expect("register");
    registrar
        .unregister("app", &stale_cookie)
        .await
        .expect("unregister");
    let cookie = registrar.register("app").await.expect("re-register");

    let waiting = bundle("dtn://peer/app", "dtn://local-node/app", b"for the new owner");
    harness.storage.put(waiting.clone());
    registrar.deliver_later("app", &waiting).await;

    let stale = Arc::new(RecordingCallback::new());
    assert_eq!(
        registrar.set_active("app", &stale_cookie, stale.clone()).await,
        Err(RegistrarError::BadCookie)
    );
    assert_eq!(
        registrar.set_passive("app", &stale_cookie).await,
        Err(RegistrarError::BadCookie)
    );
    assert!(registrar
        .dump_registrations()
        .await
        .to_string()
        .contains("app PASSIVE"));

    let owner = Arc::new(RecordingCallback::new());
    registrar
        .set_active("app", &cookie, owner.clone())
        .await
        .expect("set active");
    assert!(owner.wait_for_calls(1).await);
    assert_eq!(owner.accepted(), vec![waiting]);
    assert_eq!(stale.calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mode_changes_racing_unregister_never_touch_the_next_owner() {
    let harness = CoreHarness::default();
    let registrar = harness.core.registrar().clone();
    let stale_cookie = registrar.register("app").await.expect("register");

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let registrar = registrar.clone();
        let stale_cookie = stale_cookie.clone();
        tasks.push(tokio::spawn(async move {
            let callback = Arc::new(RecordingCallback::new());
            let _ = registrar.set_active("app", &stale_cookie, callback).await;
        }));
    }
    registrar
        .unregister("app", &stale_cookie)
        .await
        .expect("unregister");
    let cookie = registrar.register("app").await.expect("re-register");
    for task in tasks {
        task.await.expect("join");
    }

    assert!(registrar
        .dump_registrations()
        .await
        .to_string()
        .contains("app PASSIVE"));
    let stale = Arc::new(RecordingCallback::new());
    assert_eq!(
        registrar.set_active("app", &stale_cookie, stale).await,
        Err(RegistrarError::BadCookie)
    );
    assert!(registrar.set_passive("app", &cookie).await.is_ok());
}

#[tokio::test]
async fn unregistering_unknown_sink_fails() {
    let harness = CoreHarness::default();
    assert_eq!(
        harness.core.registrar().unregister("ghost", "cookie").await,
        Err(RegistrarError::SinkNotRegistered("ghost".to_string()))
    );
}

#[tokio::test]
async fn empty_arguments_are_null_arguments() {
    let harness = CoreHarness::default();
    let registrar = harness.core.registrar();
    assert_eq!(
        registrar.register("").await,
        Err(RegistrarError::NullArgument("sink"))
    );
    registrar.register("app").await.expect("register");
    assert_eq!(
        registrar.unregister("app", "").await,
        Err(RegistrarError::NullArgument("cookie"))
    );
}

#[tokio::test]
async fn passive_registration_refuses_push_delivery() {
    let harness = CoreHarness::default();
    let registrar = harness.core.registrar();
    registrar.register("app").await.expect("register");

    let incoming = bundle("dtn://peer/app", "dtn://local-node/app", b"hi");
    assert_eq!(
        registrar.deliver("app", &incoming).await,
        Err(DeliveryError::PassiveRegistration)
    );
}

#[tokio::test]
async fn delivery_matches_registered_prefix() {
    let harness = CoreHarness::default();
    let registrar = harness.core.registrar();
    let callback = Arc::new(RecordingCallback::new());
    registrar
        .register_active("app", callback.clone())
        .await
        .expect("register");

    let incoming = bundle("dtn://peer/app", "dtn://local-node/app/sub", b"hi");
    registrar
        .deliver("app/sub", &incoming)
        .await
        .expect("prefix match");
    assert_eq!(callback.accepted(), vec![incoming.clone()]);

    assert_eq!(
        registrar.deliver("other", &incoming).await,
        Err(DeliveryError::UnregisteredSink)
    );
}

#[tokio::test]
async fn longest_registered_prefix_receives_the_bundle() {
    let harness = CoreHarness::default();
    let registrar = harness.core.registrar();
    let broad = Arc::new(RecordingCallback::new());
    let narrow = Arc::new(RecordingCallback::new());
    registrar
        .register_active("app", broad.clone())
        .await
        .expect("register");
    registrar
        .register_active("app/sub", narrow.clone())
        .await
        .expect("register");

    let incoming = bundle("dtn://peer/app", "dtn://local-node/app/sub/x", b"hi");
    registrar
        .deliver("app/sub/x", &incoming)
        .await
        .expect("deliver");

    assert_eq!(narrow.calls(), 1);
    assert_eq!(broad.calls(), 0);
}

#[tokio::test]
async fn refusing_callback_surfaces_delivery_refused() {
    let harness = CoreHarness::default();
    let registrar = harness.core.registrar();
    registrar
        .register_active("app", Arc::new(RecordingCallback::refusing()))
        .await
        .expect("register");

    let incoming = bundle("dtn://peer/app", "dtn://local-node/app", b"hi");
    assert!(matches!(
        registrar.deliver("app", &incoming).await,
        Err(DeliveryError::DeliveryRefused(_))
    ));
}

#[tokio::test]
async fn mode_flips_follow_set_active_and_set_passive() {
    let harness = CoreHarness::default();
    let registrar = harness.core.registrar();
    let cookie = registrar.register("app").await.expect("register");
    let callback = Arc::new(RecordingCallback::new());
    let incoming = bundle("dtn://peer/app", "dtn://local-node/app", b"hi");

    registrar
        .set_active("app", &cookie, callback.clone())
        .await
        .expect("set active");
    registrar.deliver("app", &incoming).await.expect("active");

    registrar.set_passive("app", &cookie).await.expect("set passive");
    assert_eq!(
        registrar.deliver("app", &incoming).await,
        Err(DeliveryError::PassiveRegistration)
    );

    registrar
        .set_active("app", &cookie, callback.clone())
        .await
        .expect("set active");
    registrar
        .set_passive_unauthenticated("app")
        .await
        .expect("admin passive");
    assert_eq!(
        registrar.deliver("app", &incoming).await,
        Err(DeliveryError::PassiveRegistration)
    );
    assert_eq!(callback.calls(), 1);
}

#[tokio::test]
async fn send_rewrites_api_me_with_local_eid() {
    let harness = CoreHarness::with_local_eid("dtn://node-7");
    let registrar = harness.core.registrar();

    let outgoing = bundle("api:me/x", "dtn://peer/app", b"hi")
        .with_report_to(eid("api:me"));
    registrar.send(outgoing.clone()).await.expect("send");

    let dispatched = harness.dispatch.dispatched();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].bid, outgoing.bid);
    assert_eq!(dispatched[0].source, eid("dtn://node-7/x"));
    assert_eq!(dispatched[0].report_to, eid("dtn://node-7"));
    assert_eq!(dispatched[0].destination, eid("dtn://peer/app"));
}

#[tokio::test]
async fn send_with_unrewritable_identifier_is_malformed() {
    // ipn identifiers take no path, so api:me/x has no rewrite under ipn:7.0.
    let harness = CoreHarness::with_local_eid("ipn:7.0");
    let outgoing = bundle("api:me/x", "dtn://peer/app", b"hi");

    assert!(matches!(
        harness.core.registrar().send(outgoing).await,
        Err(RegistrarError::BundleMalformed(_))
    ));
    assert!(harness.dispatch.dispatched().is_empty());
}

#[tokio::test]
async fn disabled_registrar_rejects_every_sink_operation() {
    let config = CoreConfig {
        components: dtn_core::ComponentsConfig {
            registrar: false,
            link_local: true,
        },
        ..CoreConfig::default()
    };
    let harness = CoreHarness::start(config);
    let registrar = harness.core.registrar();
    let callback = Arc::new(RecordingCallback::new());
    let any = bundle("dtn://peer/app", "dtn://local-node/app", b"hi");

    assert_eq!(registrar.register("app").await, Err(RegistrarError::RegistrarDisabled));
    assert_eq!(
        registrar.register_active("app", callback.clone()).await,
        Err(RegistrarError::RegistrarDisabled)
    );
    assert_eq!(registrar.is_registered("app").await, Err(RegistrarError::RegistrarDisabled));
    assert_eq!(registrar.unregister("app", "c").await, Err(RegistrarError::RegistrarDisabled));
    assert_eq!(
        registrar.set_active("app", "c", callback).await,
        Err(RegistrarError::RegistrarDisabled)
    );
    assert_eq!(registrar.set_passive("app", "c").await, Err(RegistrarError::RegistrarDisabled));
    assert_eq!(
        registrar.send_as("app", "c", any.clone()).await,
        Err(RegistrarError::RegistrarDisabled)
    );
    assert_eq!(registrar.check_inbox("app", "c").await, Err(RegistrarError::RegistrarDisabled));
    assert_eq!(
        registrar.deliver("app", &any).await,
        Err(DeliveryError::DeliveryDisabled)
    );
    assert!(registrar.dump_registrations().await.to_string().contains("disabled"));
}
