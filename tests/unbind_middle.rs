use evented::{Dispatcher, EventData, OpaqueData};

#[path = "support/mod.rs"]
mod support;
use support::Validator;

fn v_of<'a>(arg: OpaqueData) -> &'a Validator<&'static str> {
    unsafe { &*(arg.0 as *const Validator<&'static str>) }
}

fn cb1(_evt: &mut EventData<()>, arg: OpaqueData) {
    v_of(arg).push("cb1");
}

fn u1(evt: &mut EventData<()>, arg: OpaqueData) {
    v_of(arg).push("U1");
    evt.notifier.unbind(u1);
}

fn cb2(_evt: &mut EventData<()>, arg: OpaqueData) {
    v_of(arg).push("cb2");
}

/// A binding that unbinds itself mid-walk still runs its turn in full, and
/// is gone only after the dispatch's cleanup pass.
#[test]
fn self_unbind_in_the_middle_still_runs_and_leaves_neighbors_intact() {
    let dispatcher = Dispatcher::new(());
    let e = dispatcher.create_event("E").unwrap();

    let v = Validator::new();
    let arg = OpaqueData(&v as *const Validator<&'static str> as *mut ());

    e.bind(cb1, arg).unwrap();
    e.bind(u1, arg).unwrap();
    e.bind(cb2, arg).unwrap();

    e.trigger(OpaqueData::NULL, None, OpaqueData::NULL).unwrap();
    v.expect(["cb1", "U1", "cb2"]);

    // u1 is gone; cb1 and cb2 remain, in their original relative order.
    e.trigger(OpaqueData::NULL, None, OpaqueData::NULL).unwrap();
    v.expect(["cb1", "cb2"]);
}
