use evented::{Dispatcher, EventData, OpaqueData};

#[path = "support/mod.rs"]
mod support;
use support::Validator;

fn v_of<'a>(arg: OpaqueData) -> &'a Validator<&'static str> {
    unsafe { &*(arg.0 as *const Validator<&'static str>) }
}

fn u1(evt: &mut EventData<()>, arg: OpaqueData) {
    v_of(arg).push("U1");
    evt.notifier.unbind(cb1);
}

fn cb1(_evt: &mut EventData<()>, arg: OpaqueData) {
    v_of(arg).push("cb1");
}

/// A binding that unbinds a not-yet-visited peer still lets that peer run
/// during the same dispatch; the unbind only takes effect at cleanup.
#[test]
fn unbind_of_later_peer_does_not_short_circuit_the_walk() {
    let dispatcher = Dispatcher::new(());
    let e = dispatcher.create_event("E").unwrap();

    let v = Validator::new();
    let arg = OpaqueData(&v as *const Validator<&'static str> as *mut ());

    e.bind(u1, arg).unwrap();
    e.bind(cb1, arg).unwrap();

    e.trigger(OpaqueData::NULL, None, OpaqueData::NULL).unwrap();
    v.expect(["U1", "cb1"]);

    // cb1 is gone after the dispatch that unbound it: triggering again only
    // runs U1 (now a no-op unbind of an already-gone callback).
    e.trigger(OpaqueData::NULL, None, OpaqueData::NULL).unwrap();
    v.expect(["U1"]);
}
