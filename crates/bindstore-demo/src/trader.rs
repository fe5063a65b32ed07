#![forbid(unsafe_code)]

//! A trading-desk view model.
//!
//! Worker threads record fills and status lines; the affinity thread sees
//! every change through the store's subscribers. Kicking a trader asks a
//! confirmation collaborator first and only disconnects on an affirmative
//! answer.

use std::sync::Arc;

use bindstore_core::{
    AffinityContext, Bindable, Check, Length, PropertyKey, PropertyRegistry, PropertyStore,
    Required, Result, RuleSet, StoreConfig,
};
use parking_lot::Mutex;
use tracing::info;

pub const TRADER_NAME: PropertyKey<String> = PropertyKey::new("TraderName");
pub const CONNECTED: PropertyKey<bool> = PropertyKey::new("Connected");
pub const ORDERS_FILLED: PropertyKey<u64> = PropertyKey::new("OrdersFilled");
pub const STATUS: PropertyKey<String> = PropertyKey::new("Status");

/// Answers a yes/no question put to the user.
pub trait Confirm {
    fn confirm(&self, title: &str, message: &str) -> bool;
}

impl<F: Fn(&str, &str) -> bool> Confirm for F {
    fn confirm(&self, title: &str, message: &str) -> bool {
        self(title, message)
    }
}

/// Result of [`TraderViewModel::kick_trader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KickOutcome {
    Kicked,
    Declined,
    NotConnected,
}

pub struct TraderViewModel {
    props: PropertyStore<TraderViewModel>,
    fills: Mutex<u64>,
}

impl TraderViewModel {
    pub fn new(
        trader: &str,
        context: Arc<dyn AffinityContext>,
        config: StoreConfig,
    ) -> Result<Arc<Self>> {
        let vm = Arc::new_cyclic(|owner| TraderViewModel {
            props: PropertyStore::with_registry(owner.clone(), context, Arc::new(registry()))
                .with_config(config),
            fills: Mutex::new(0),
        });
        vm.props.set(TRADER_NAME, trader.to_owned())?;
        vm.props.set(CONNECTED, true)?;
        Ok(vm)
    }

    #[must_use]
    pub fn props(&self) -> &PropertyStore<Self> {
        &self.props
    }

    pub fn trader_name(&self) -> Result<String> {
        self.props.get(TRADER_NAME)
    }

    pub fn rename(&self, name: &str) -> Result<bool> {
        self.props.set(TRADER_NAME, name.to_owned())
    }

    pub fn is_connected(&self) -> Result<bool> {
        self.props.get(CONNECTED)
    }

    pub fn orders_filled(&self) -> Result<u64> {
        self.props.get(ORDERS_FILLED)
    }

    pub fn status(&self) -> Result<String> {
        self.props.get(STATUS)
    }

    /// Record one fill from `worker`.
    ///
    /// The count is bumped and published under one lock, so `OrdersFilled`
    /// never moves backwards. Observers must not record fills themselves
    /// when the store delivers inline.
    pub fn record_fill(&self, worker: usize) -> Result<u64> {
        let count = {
            let mut fills = self.fills.lock();
            *fills += 1;
            self.props.set(ORDERS_FILLED, *fills)?;
            *fills
        };
        self.props
            .set(STATUS, format!("worker {worker} filled order #{count}"))?;
        Ok(count)
    }

    /// Disconnect the trader once `confirm` agrees.
    pub fn kick_trader(&self, confirm: &impl Confirm) -> Result<KickOutcome> {
        if !self.is_connected()? {
            return Ok(KickOutcome::NotConnected);
        }
        let name = self.trader_name()?;
        let agreed = confirm.confirm(
            &format!("Confirm kicking {name} off"),
            &format!("Are you sure you want to kick off {name}?"),
        );
        if !agreed {
            self.props.set(STATUS, format!("kick of {name} cancelled"))?;
            return Ok(KickOutcome::Declined);
        }
        self.props.set(CONNECTED, false)?;
        self.props.set(STATUS, format!("{name} kicked off"))?;
        info!(trader = %name, "trader kicked");
        Ok(KickOutcome::Kicked)
    }
}

impl Bindable for TraderViewModel {
    fn properties(&self) -> &PropertyStore<Self> {
        &self.props
    }
}

fn registry() -> PropertyRegistry<TraderViewModel> {
    PropertyRegistry::new()
        .validated(
            TRADER_NAME,
            |vm: &TraderViewModel| vm.props.get(TRADER_NAME).unwrap_or_default(),
            RuleSet::new()
                .with(Required::new().with_message("A trader name is required."))
                .with(Length::max(32))
                .with(Check::new(
                    "Trader names cannot start with whitespace.",
                    |name: &String| !name.starts_with(char::is_whitespace),
                )),
        )
        .property(CONNECTED, |vm: &TraderViewModel| {
            vm.props.get(CONNECTED).unwrap_or_default()
        })
        .property(ORDERS_FILLED, |vm: &TraderViewModel| {
            vm.props.get(ORDERS_FILLED).unwrap_or_default()
        })
        .property(STATUS, |vm: &TraderViewModel| {
            vm.props.get(STATUS).unwrap_or_default()
        })
}
