use evented::{alloc_probe, Dispatcher, Event, EventData, OpaqueData};

struct Ctx {
    dispatcher: Dispatcher<()>,
    inner_event: Event<()>,
}

fn ctx_of<'a>(arg: OpaqueData) -> &'a Ctx {
    unsafe { &*(arg.0 as *const Ctx) }
}

fn outer_cb(_evt: &mut EventData<()>, arg: OpaqueData) {
    let ctx = ctx_of(arg);
    ctx.inner_event
        .trigger(OpaqueData::NULL, None, OpaqueData::NULL)
        .unwrap();
    ctx.dispatcher.destroy();
    // Destruction is deferred: the outer event is still on the books right
    // after `destroy()` returns, because this callback is still running
    // inside the dispatch that triggered it.
    assert!(ctx.dispatcher.get_event("Outer").is_some());
}

/// `destroy()` called from within a callback must not free the dispatcher's
/// storage before the outermost `trigger` call returns.
#[test]
fn destroy_from_within_a_callback_is_deferred_to_the_outer_trigger() {
    let _g = alloc_probe::test_lock();
    alloc_probe::clear();

    let dispatcher = Dispatcher::new(());
    let outer = dispatcher.create_event("Outer").unwrap();
    let inner = dispatcher.create_event("Inner").unwrap();

    let ctx = Ctx {
        dispatcher: dispatcher.clone(),
        inner_event: inner,
    };
    let arg = OpaqueData(&ctx as *const Ctx as *mut ());
    outer.bind(outer_cb, arg).unwrap();

    let live_before = alloc_probe::live_allocations();
    outer
        .trigger(OpaqueData::NULL, None, OpaqueData::NULL)
        .unwrap();

    // By the time the outermost trigger call returns, destruction has run:
    // both events are gone and every allocation it held has been released.
    assert!(dispatcher.get_event("Outer").is_none());
    assert!(dispatcher.get_event("Inner").is_none());
    assert!(alloc_probe::live_allocations() < live_before);

    alloc_probe::clear();
}
