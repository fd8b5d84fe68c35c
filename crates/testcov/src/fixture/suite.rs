//! Tests for the event listener dispatcher

use super::listeners::{handler, DispatchMode, EventArgs, EventBus, Handler, ListenerError};
use std::time::Duration;
use testcov_core::{TestFault, TOKEN_PARAM};
use testcov_runner::{check, check_eq, test_case, TestContext, TestSuite};

const EVENT: &str = "test";

fn example_args() -> EventArgs {
    EventArgs::default().arg("test").kwarg("test", "test")
}

fn example_handler() -> Handler {
    handler(|args: EventArgs| async move {
        if args.args.first().map(String::as_str) != Some("test") {
            return Err(format!("unexpected positional arguments {:?}", args.args));
        }
        if args.kwargs.get("test").map(String::as_str) != Some("test") {
            return Err(format!("unexpected keyword arguments {:?}", args.kwargs));
        }
        Ok(())
    })
}

fn bus(ctx: &TestContext) -> EventBus {
    EventBus::new(ctx.probe().clone())
}

fn dispatch_fault(err: ListenerError) -> TestFault {
    TestFault::error(err.to_string())
}

async fn rejects_missing_handler(ctx: TestContext, mode: DispatchMode) -> Result<(), TestFault> {
    let result = bus(&ctx).add_listener(EVENT, mode, None);
    check!(
        matches!(result, Err(ListenerError::MissingHandler { .. })),
        "listener without handler was accepted"
    );
    Ok(())
}

async fn dispatches_with_handler(ctx: TestContext, mode: DispatchMode) -> Result<(), TestFault> {
    let bus = bus(&ctx);
    let listener = bus
        .add_listener(EVENT, mode, Some(example_handler()))
        .map_err(dispatch_fault)?;
    let fired = bus.dispatch(EVENT, example_args()).await.map_err(dispatch_fault)?;
    check_eq!(fired, 1);
    check!(listener.dispatched());
    check_eq!(listener.last_args(), Some(example_args()));
    Ok(())
}

/// The bundled suite
#[must_use]
pub fn suite() -> TestSuite {
    TestSuite::new()
        .with(test_case!("single_dispatch_without_handler", |ctx| {
            rejects_missing_handler(ctx, DispatchMode::Single)
        }))
        .with(test_case!("single_dispatch_with_handler", |ctx| {
            dispatches_with_handler(ctx, DispatchMode::Single)
        }))
        .with(test_case!("single_listener_removed_after_dispatch", |ctx| async move {
            let bus = bus(&ctx);
            let listener = bus
                .add_single_listener(EVENT, Some(example_handler()))
                .map_err(dispatch_fault)?;
            check_eq!(listener.event(), EVENT);
            check_eq!(listener.mode(), DispatchMode::Single);
            check!(bus.contains(EVENT, listener.id()));

            bus.dispatch(EVENT, example_args()).await.map_err(dispatch_fault)?;
            check!(listener.dispatched());
            check!(!bus.contains(EVENT, listener.id()), "single listener still registered");
            Ok(())
        }))
        .with(test_case!("multi_dispatch_without_handler", |ctx| {
            rejects_missing_handler(ctx, DispatchMode::Multi)
        }))
        .with(test_case!("multi_dispatch_with_handler", |ctx| {
            dispatches_with_handler(ctx, DispatchMode::Multi)
        }))
        .with(test_case!("multi_listener_kept_after_dispatch", |ctx| async move {
            let bus = bus(&ctx);
            let listener = bus
                .add_multi_listener(EVENT, Some(example_handler()))
                .map_err(dispatch_fault)?;
            for _ in 0..3 {
                bus.dispatch(EVENT, example_args()).await.map_err(dispatch_fault)?;
            }
            check!(bus.contains(EVENT, listener.id()), "multi listener was removed");
            check!(bus.remove(listener.id()));
            check_eq!(bus.listener_count(EVENT), 0);
            Ok(())
        }))
        .with(test_case!("failing_handler_is_reported", |ctx| async move {
            let bus = bus(&ctx);
            bus.add_multi_listener(EVENT, Some(example_handler()))
                .map_err(dispatch_fault)?;
            let result = bus.dispatch(EVENT, EventArgs::default().arg("other")).await;
            check!(
                matches!(result, Err(ListenerError::Handler { .. })),
                "bad arguments were accepted"
            );
            Ok(())
        }))
        .with(test_case!("add_single_listener_then_dispatch", |ctx| async move {
            let bus = bus(&ctx);
            check_eq!(bus.listener_count("ready"), 0);
            bus.add_single_listener("ready", Some(handler(|_| async { Ok(()) })))
                .map_err(dispatch_fault)?;
            check_eq!(bus.listener_count("ready"), 1);
            bus.dispatch("ready", EventArgs::default())
                .await
                .map_err(dispatch_fault)?;
            check_eq!(bus.listener_count("ready"), 0);
            Ok(())
        }))
        .with(test_case!("wait_for_resolves_on_dispatch", |ctx| async move {
            let bus = bus(&ctx);
            let trigger = async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                bus.dispatch("ready", EventArgs::default().arg("go")).await
            };
            let (received, fired) = tokio::join!(bus.wait_for("ready"), trigger);
            check_eq!(fired.map_err(dispatch_fault)?, 1);
            check_eq!(received, Some(EventArgs::default().arg("go")));
            Ok(())
        }))
        .with(
            test_case!("client_start_with_token", |ctx| async move {
                let token = ctx.require_token()?;
                check!(!token.trim().is_empty(), "token is blank");
                check!(
                    !token.chars().any(char::is_whitespace),
                    "token contains whitespace"
                );

                let bus = bus(&ctx);
                bus.add_single_listener("ready", Some(handler(|_| async { Ok(()) })))
                    .map_err(dispatch_fault)?;
                let fired = bus
                    .dispatch("ready", EventArgs::default().kwarg("token", token))
                    .await
                    .map_err(dispatch_fault)?;
                check_eq!(fired, 1);
                Ok(())
            })
            .requires(TOKEN_PARAM),
        )
}
