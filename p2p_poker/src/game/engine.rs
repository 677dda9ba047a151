//! The per-node game replica.
//!
//! A [`GameEngine`] is owned by exactly one control loop and is never
//! shared. It performs no I/O: outbound messages and the deal timer are
//! queued as [`Effect`]s that the owner drains and executes after every
//! call.
//!
//! Turn order: the first non-folded seat after the dealer opens each
//! betting round and the dealer acts last. The dealer's action closes the
//! round, so every node advances the phase when it applies the dealer's
//! action. Only the seats taken when the deal started play the hand; a
//! seat taken mid-hand joins from the next one.

use log::{debug, info, warn};
use std::{collections::BTreeSet, mem, time::Duration};

use super::{
    GameError,
    deck::Deck,
    entities::{Address, GamePhase, GameSnapshot, PlayerAction},
    shuffle::{DeckTransform, EncryptedDeck, ShuffleEncrypt},
};
use crate::{
    net::messages::{ActionMessage, Payload},
    table::{Table, TableConfig},
};

/// Side effects requested by the engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Effect {
    /// Send `payload` to each address in `to`.
    Broadcast { to: Vec<Address>, payload: Payload },
    /// Call [`GameEngine::on_deal_timer`] with `hand` after `delay`.
    ArmDealTimer { hand: u64, delay: Duration },
}

pub struct GameEngine {
    address: Address,
    config: TableConfig,
    phase: GamePhase,
    /// Every known player, ourselves included, sorted by address.
    roster: Vec<Address>,
    ready: BTreeSet<Address>,
    table: Table,
    /// Seats dealt into the current hand. Empty between hands.
    in_hand: BTreeSet<Address>,
    dealer: Address,
    turn: Option<Address>,
    /// Hands completed so far. Also tags the deal timer.
    hand: u64,
    deal_timer: Option<u64>,
    transform: Box<dyn DeckTransform>,
    effects: Vec<Effect>,
}

impl GameEngine {
    #[must_use]
    pub fn new(address: Address, config: TableConfig) -> Self {
        Self::with_transform(address, config, Box::new(ShuffleEncrypt::new()))
    }

    #[must_use]
    pub fn with_transform(
        address: Address,
        config: TableConfig,
        transform: Box<dyn DeckTransform>,
    ) -> Self {
        let table = Table::new(config.max_seats);
        Self {
            roster: vec![address.clone()],
            dealer: address.clone(),
            address,
            config,
            phase: GamePhase::Connected,
            ready: BTreeSet::new(),
            table,
            in_hand: BTreeSet::new(),
            turn: None,
            hand: 0,
            deal_timer: None,
            transform,
            effects: Vec::new(),
        }
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    #[must_use]
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    #[must_use]
    pub fn dealer(&self) -> &Address {
        &self.dealer
    }

    #[must_use]
    pub fn turn(&self) -> Option<&Address> {
        self.turn.as_ref()
    }

    #[must_use]
    pub fn hand(&self) -> u64 {
        self.hand
    }

    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    #[must_use]
    pub fn roster(&self) -> &[Address] {
        &self.roster
    }

    #[must_use]
    pub fn is_ready(&self, addr: &Address) -> bool {
        self.ready.contains(addr)
    }

    #[must_use]
    pub fn is_dealer(&self) -> bool {
        self.dealer == self.address
    }

    /// Take every effect queued since the last drain.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        mem::take(&mut self.effects)
    }

    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            address: Some(self.address.clone()),
            phase: self.phase,
            dealer: Some(self.dealer.clone()),
            turn: self.turn.clone(),
            hand: self.hand,
            players: self.roster.clone(),
            ready: self.ready.iter().cloned().collect(),
            seats: self.table.views(),
        }
    }

    /// A peer finished its handshake.
    pub fn add_player(&mut self, addr: &Address) {
        if let Err(idx) = self.roster.binary_search(addr) {
            self.roster.insert(idx, addr.clone());
            info!("[{}] player {} joined", self.address, addr);
            self.elect_bootstrap_dealer();
            self.maybe_arm_deal_timer();
        }
    }

    /// A peer's link went away. Its seat is freed without moving anybody
    /// else, and the turn and dealer move on if they pointed at it.
    pub fn remove_player(&mut self, addr: &Address) {
        if *addr == self.address {
            return;
        }
        let Ok(idx) = self.roster.binary_search(addr) else {
            return;
        };

        if self.turn.as_ref() == Some(addr) {
            self.turn = self.next_turn_after(addr).filter(|next| next != addr);
        }
        let successor = self.table.after(addr).ok().map(|seat| seat.address.clone());

        self.roster.remove(idx);
        self.ready.remove(addr);
        let mut dealt = self.in_hand.remove(addr);
        if let Ok(seat) = self.table.remove_player(addr) {
            info!(
                "[{}] player {} left seat {}",
                self.address, addr, seat.position
            );
            dealt = true;
        }

        if self.dealer == *addr {
            self.dealer = successor
                .filter(|next| next != addr)
                .or_else(|| self.roster.first().cloned())
                .unwrap_or_else(|| self.address.clone());
            info!("[{}] dealer left, new dealer is {}", self.address, self.dealer);
        }

        if self.phase == GamePhase::Dealing && dealt {
            // The deck can't make it around the table any more.
            warn!(
                "[{}] {} left while dealing, abandoning hand {}",
                self.address, addr, self.hand
            );
            self.abandon_hand();
        } else if self.phase.is_in_hand() && self.in_hand.len() < 2 {
            warn!(
                "[{}] not enough players left, abandoning hand {}",
                self.address, self.hand
            );
            self.abandon_hand();
        }

        self.elect_bootstrap_dealer();
        self.maybe_arm_deal_timer();
    }

    /// The local player is ready for the next hand.
    pub fn set_ready(&mut self) -> Result<(), GameError> {
        self.mark_self_ready()?;
        self.maybe_arm_deal_timer();
        Ok(())
    }

    /// A remote player announced it is ready for the next hand.
    pub fn handle_ready(&mut self, from: &Address) -> Result<(), GameError> {
        if *from == self.address {
            return Ok(());
        }
        self.add_player(from);
        let position = self.take_seat(from)?;
        self.ready.insert(from.clone());
        info!(
            "[{}] player {} is ready at seat {}",
            self.address, from, position
        );
        self.maybe_arm_deal_timer();
        Ok(())
    }

    /// The deal timer armed for `hand` fired.
    pub fn on_deal_timer(&mut self, hand: u64) -> Result<(), GameError> {
        if self.deal_timer != Some(hand) {
            debug!("[{}] ignoring stale deal timer for hand {}", self.address, hand);
            return Ok(());
        }
        self.deal_timer = None;

        if !self.is_dealer() || self.phase != GamePhase::PlayerReady {
            debug!(
                "[{}] deal timer fired during {}, not dealing",
                self.address, self.phase
            );
            return Ok(());
        }
        if self.table.len_players() < self.config.min_players {
            info!(
                "[{}] only {} seated players, not dealing",
                self.address,
                self.table.len_players()
            );
            return Ok(());
        }

        self.initiate_deal()
    }

    /// The deck arrived from `from`.
    pub fn handle_encrypted_deck(
        &mut self,
        from: &Address,
        deck: EncryptedDeck,
    ) -> Result<(), GameError> {
        let prev = self.table.before(&self.address)?.address.clone();
        if *from != prev {
            return Err(GameError::UnexpectedSender {
                expected: prev,
                got: from.clone(),
            });
        }

        if self.is_dealer() {
            if self.phase != GamePhase::Dealing {
                return Err(GameError::PhaseMismatch {
                    expected: self.phase,
                    got: GamePhase::Dealing,
                });
            }
            self.enter_preflop();
            info!(
                "[{}] deck is back from {}, starting hand {}",
                self.address, from, self.hand
            );
            let seated = self.seated_others();
            self.send(seated, Payload::PreFlopComplete);
            return Ok(());
        }

        if self.phase.is_in_hand() {
            return Err(GameError::PhaseMismatch {
                expected: self.phase,
                got: GamePhase::Dealing,
            });
        }

        let next = self.table.after(&self.address)?.address.clone();
        self.transform.new_hand();
        let deck = self.transform.transform(deck)?;
        info!(
            "[{}] received deck from {}, passing it on to {}",
            self.address, from, next
        );
        self.send(vec![next], Payload::EncryptedDeck { deck });
        self.table.set_player_phase(from, GamePhase::Dealing)?;
        self.set_phase(GamePhase::Dealing);
        self.in_hand = self.seated();
        Ok(())
    }

    /// The dealer announced the deck made it around the table.
    pub fn handle_preflop_complete(&mut self, from: &Address) -> Result<(), GameError> {
        if *from != self.dealer {
            return Err(GameError::UnexpectedSender {
                expected: self.dealer.clone(),
                got: from.clone(),
            });
        }
        if self.phase != GamePhase::Dealing {
            return Err(GameError::PhaseMismatch {
                expected: self.phase,
                got: GamePhase::PreFlop,
            });
        }
        self.enter_preflop();
        info!("[{}] pre flop, {:?} to act", self.address, self.turn);
        Ok(())
    }

    /// The local player acts.
    pub fn take_action(&mut self, action: PlayerAction) -> Result<(), GameError> {
        if self.turn.as_ref() != Some(&self.address) {
            return Err(GameError::OutOfTurn);
        }
        let me = self.address.clone();
        self.apply_action(&me, action)?;

        let msg = ActionMessage {
            phase: self.phase,
            action,
        };
        self.send(self.others(), Payload::PlayerAction(msg));
        Ok(())
    }

    /// A remote player acted.
    pub fn handle_player_action(
        &mut self,
        from: &Address,
        msg: ActionMessage,
    ) -> Result<(), GameError> {
        if self.turn.as_ref() != Some(from) {
            return Err(GameError::OutOfTurn);
        }
        let from_dealer = *from == self.dealer;
        if msg.phase != self.phase && !from_dealer {
            return Err(GameError::PhaseMismatch {
                expected: self.phase,
                got: msg.phase,
            });
        }

        self.apply_action(from, msg.action)?;

        if from_dealer && msg.phase != self.phase {
            warn!(
                "[{}] dealer {} moved to {} but we are in {}",
                self.address, from, msg.phase, self.phase
            );
        }
        Ok(())
    }

    fn mark_self_ready(&mut self) -> Result<(), GameError> {
        let me = self.address.clone();
        let position = self.take_seat(&me)?;
        self.ready.insert(me);
        if !self.phase.is_in_hand() {
            self.set_phase(GamePhase::PlayerReady);
        }
        info!("[{}] ready at seat {}", self.address, position);
        self.send(self.others(), Payload::Ready);
        Ok(())
    }

    /// Seat `addr` at its roster index, or the first free seat when that
    /// one is out of range or taken. Seated players keep their seat.
    fn take_seat(&mut self, addr: &Address) -> Result<usize, GameError> {
        if let Some(position) = self.table.position_of(addr) {
            return Ok(position);
        }

        match self.roster.iter().position(|a| a == addr) {
            Some(preferred) => match self.table.add_player_at(addr, preferred) {
                Ok(()) => Ok(preferred),
                Err(GameError::InvalidSeat(_)) => self.table.add_player(addr),
                Err(e) => Err(e),
            },
            None => self.table.add_player(addr),
        }
    }

    fn maybe_arm_deal_timer(&mut self) {
        if !self.is_dealer() || self.phase.is_in_hand() || self.deal_timer == Some(self.hand) {
            return;
        }
        if self.ready.len() < self.config.min_players {
            return;
        }

        if !self.ready.contains(&self.address) {
            if let Err(e) = self.mark_self_ready() {
                warn!("[{}] dealer could not take a seat: {}", self.address, e);
                return;
            }
        }

        self.deal_timer = Some(self.hand);
        info!(
            "[{}] {} players ready, dealing in {:?}",
            self.address,
            self.ready.len(),
            self.config.deal_delay
        );
        self.effects.push(Effect::ArmDealTimer {
            hand: self.hand,
            delay: self.config.deal_delay,
        });
    }

    fn initiate_deal(&mut self) -> Result<(), GameError> {
        let next = self.table.after(&self.address)?.address.clone();

        self.transform.new_hand();
        let deck = self.transform.transform(Deck::new().to_blobs()?)?;

        self.set_phase(GamePhase::Dealing);
        self.in_hand = self.seated();
        info!("[{}] dealing cards to {}", self.address, next);
        self.send(vec![next], Payload::EncryptedDeck { deck });
        Ok(())
    }

    fn enter_preflop(&mut self) {
        self.phase = GamePhase::PreFlop;
        self.table.set_all_phases(GamePhase::PreFlop);
        self.table.reset_actions();
        if self.in_hand.is_empty() {
            self.in_hand = self.seated();
        }
        self.turn = self.first_to_act();
    }

    fn apply_action(&mut self, from: &Address, action: PlayerAction) -> Result<(), GameError> {
        self.table.set_player_action(from, action)?;
        info!(
            "[{}] {} took action {} during {}",
            self.address, from, action, self.phase
        );

        if *from == self.dealer {
            self.advance_round();
        } else {
            self.turn = self.next_turn_after(from);
        }
        Ok(())
    }

    fn advance_round(&mut self) {
        let Some(next) = self.phase.next_round() else {
            return;
        };
        self.table.reset_actions();

        if next == GamePhase::PlayerReady {
            self.end_hand();
            return;
        }

        self.phase = next;
        self.table.set_all_phases(next);
        self.turn = self.first_to_act();
        info!("[{}] advanced to {}", self.address, next);
    }

    fn end_hand(&mut self) {
        self.hand += 1;
        self.phase = GamePhase::PlayerReady;
        self.table.set_all_phases(GamePhase::PlayerReady);
        self.ready.clear();
        self.in_hand.clear();
        self.turn = None;
        self.deal_timer = None;

        match self.table.after(&self.dealer) {
            Ok(seat) => self.dealer = seat.address.clone(),
            Err(e) => debug!("[{}] dealer stays: {}", self.address, e),
        }
        info!(
            "[{}] hand {} finished, next dealer is {}",
            self.address, self.hand, self.dealer
        );
    }

    fn abandon_hand(&mut self) {
        self.phase = GamePhase::PlayerReady;
        self.table.set_all_phases(GamePhase::PlayerReady);
        self.table.reset_actions();
        self.ready.clear();
        self.in_hand.clear();
        self.turn = None;
        self.deal_timer = None;
    }

    /// Until the first hand is over the dealer is the lowest address.
    fn elect_bootstrap_dealer(&mut self) {
        if self.hand > 0 || self.phase.is_in_hand() {
            return;
        }
        if let Some(head) = self.roster.first() {
            if *head != self.dealer {
                self.dealer = head.clone();
                info!("[{}] dealer is {}", self.address, self.dealer);
            }
        }
    }

    fn first_to_act(&self) -> Option<Address> {
        self.next_turn_after(&self.dealer)
    }

    /// Next seat clockwise of `addr` that was dealt in and hasn't folded
    /// this round. The dealer is never skipped.
    fn next_turn_after(&self, addr: &Address) -> Option<Address> {
        let mut cursor = addr.clone();
        for _ in 0..self.table.max_seats() {
            let seat = self.table.after(&cursor).ok()?;
            if seat.address == self.dealer {
                return Some(seat.address.clone());
            }
            if seat.action != PlayerAction::Fold && self.in_hand.contains(&seat.address) {
                return Some(seat.address.clone());
            }
            cursor = seat.address.clone();
        }
        None
    }

    fn set_phase(&mut self, phase: GamePhase) {
        self.phase = phase;
        if let Err(e) = self.table.set_player_phase(&self.address, phase) {
            debug!("[{}] {}", self.address, e);
        }
    }

    fn others(&self) -> Vec<Address> {
        self.roster
            .iter()
            .filter(|addr| **addr != self.address)
            .cloned()
            .collect()
    }

    fn seated(&self) -> BTreeSet<Address> {
        self.table.players().map(|seat| seat.address.clone()).collect()
    }

    fn seated_others(&self) -> Vec<Address> {
        self.table
            .players()
            .map(|seat| seat.address.clone())
            .filter(|addr| *addr != self.address)
            .collect()
    }

    fn send(&mut self, to: Vec<Address>, payload: Payload) {
        if to.is_empty() {
            return;
        }
        self.effects.push(Effect::Broadcast { to, payload });
    }
}
