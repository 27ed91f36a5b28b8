//! Lifecycle and trade notifications.

use {
    crate::domain::eth::{Address, TokenAddress, U256},
    tokio::sync::broadcast,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    PoolCreated {
        index: u64,
        raising_token: TokenAddress,
        token: TokenAddress,
    },
    TokensBought {
        index: u64,
        buyer: Address,
        payment_in: U256,
        tokens_out: U256,
        fee: U256,
    },
    TokensSold {
        index: u64,
        seller: Address,
        tokens_in: U256,
        payment_out: U256,
        fee: U256,
    },
    PoolEnded {
        index: u64,
        raised: U256,
    },
    PlatformFeeClaimed {
        token: TokenAddress,
        amount: U256,
    },
}

/// Fan-out channel for [`Event`]s. Slow subscribers miss events rather than
/// back-pressuring the engine.
#[derive(Debug)]
pub struct Events {
    sender: broadcast::Sender<Event>,
}

impl Default for Events {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self { sender }
    }
}

impl Events {
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Best effort delivery; an engine without subscribers is fine.
    pub(crate) fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }
}
