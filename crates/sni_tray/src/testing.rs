//! In-memory [`ItemBus`] for the tests.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use futures::{
    channel::mpsc,
    future::{self, LocalBoxFuture},
    stream::LocalBoxStream,
    FutureExt, StreamExt,
};
use tokio::sync::oneshot;

use crate::{Error, ItemBus, ItemMethod, ItemTarget, Payload, PropertyKind, Result, TrayService};

#[derive(Default)]
struct MockState {
    answers: HashMap<PropertyKind, Payload>,
    gated: bool,
    gates: Vec<(PropertyKind, oneshot::Sender<Result<Payload>>)>,
    fetched: Vec<PropertyKind>,
    calls: Vec<(ItemTarget, ItemMethod)>,
    signals: HashMap<String, mpsc::UnboundedSender<String>>,
}

/// Answers property reads from a table, or holds them back until released when gated.
#[derive(Clone, Default)]
pub struct MockBus(Rc<RefCell<MockState>>);

impl std::fmt::Debug for MockBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MockBus")
    }
}

impl MockBus {
    pub fn answering(answers: impl IntoIterator<Item = (PropertyKind, Payload)>) -> Self {
        let bus = MockBus::default();
        bus.0.borrow_mut().answers = answers.into_iter().collect();
        bus
    }

    /// Every property read stays pending until [`MockBus::release`] is called.
    pub fn gated() -> Self {
        let bus = MockBus::default();
        bus.0.borrow_mut().gated = true;
        bus
    }

    pub fn set_answer(&self, kind: PropertyKind, payload: Payload) {
        self.0.borrow_mut().answers.insert(kind, payload);
    }

    /// Answer every held back read from the table. Reads without an entry fail.
    pub fn release(&self) {
        let mut state = self.0.borrow_mut();
        let gates = std::mem::take(&mut state.gates);
        for (kind, gate) in gates {
            let _ = gate.send(answer(&state.answers, kind));
        }
    }

    pub fn take_fetched(&self) -> Vec<PropertyKind> {
        std::mem::take(&mut self.0.borrow_mut().fetched)
    }

    pub fn take_calls(&self) -> Vec<ItemMethod> {
        std::mem::take(&mut self.0.borrow_mut().calls).into_iter().map(|(_, method)| method).collect()
    }

    /// Emit a signal from the item on the given bus name.
    pub fn emit(&self, bus_name: &str, signal: &str) {
        if let Some(sender) = self.0.borrow().signals.get(bus_name) {
            let _ = sender.unbounded_send(signal.to_owned());
        }
    }

    /// Whether somebody still listens to the signals of the given bus name.
    pub fn is_subscribed(&self, bus_name: &str) -> bool {
        self.0.borrow().signals.get(bus_name).is_some_and(|sender| !sender.is_closed())
    }
}

fn answer(answers: &HashMap<PropertyKind, Payload>, kind: PropertyKind) -> Result<Payload> {
    answers.get(&kind).cloned().ok_or_else(|| Error::DbusError(zbus::Error::Failure(format!("no such property: {}", kind))))
}

impl ItemBus for MockBus {
    fn get_property(&self, _target: &ItemTarget, property: PropertyKind) -> LocalBoxFuture<'static, Result<Payload>> {
        let mut state = self.0.borrow_mut();
        state.fetched.push(property);
        if state.gated {
            let (tx, rx) = oneshot::channel();
            state.gates.push((property, tx));
            async move { rx.await.unwrap_or(Err(Error::Cancelled)) }.boxed_local()
        } else {
            future::ready(answer(&state.answers, property)).boxed_local()
        }
    }

    fn call(&self, target: &ItemTarget, method: ItemMethod) -> LocalBoxFuture<'static, Result<()>> {
        self.0.borrow_mut().calls.push((target.clone(), method));
        future::ready(Ok(())).boxed_local()
    }

    fn subscribe(&self, target: &ItemTarget) -> LocalBoxFuture<'static, Result<LocalBoxStream<'static, String>>> {
        let (tx, rx) = mpsc::unbounded();
        self.0.borrow_mut().signals.insert(target.bus_name.clone(), tx);
        future::ready(Ok(rx.boxed_local())).boxed_local()
    }
}

/// Run a test future inside a [`tokio::task::LocalSet`], the way items expect to be driven.
pub fn run_local<F: std::future::Future<Output = ()>>(f: F) {
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    tokio::task::LocalSet::new().block_on(&rt, f);
}

/// Let the local tasks run and feed everything they produced back into the service.
pub async fn settle<B: ItemBus>(service: &mut TrayService<B>) {
    for _ in 0..32 {
        tokio::task::yield_now().await;
        while let Some(event) = service.try_next_item_event() {
            service.handle_item_event(event);
        }
    }
}
