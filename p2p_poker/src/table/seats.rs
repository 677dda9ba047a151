//! Fixed-capacity seat map with circular neighbor lookups.
//!
//! Seats are indexed by table position and never compacted: removing a
//! player leaves a hole, so the circular order of everyone else is stable.
//! Neighbor lookups skip holes and wrap around the table.

use std::fmt;

use crate::game::{
    GameError,
    entities::{Address, GamePhase, PlayerAction, SeatView},
};

/// A seated player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Seat {
    pub address: Address,
    pub position: usize,
    /// Last known phase of this player, kept for diagnostics.
    pub phase: GamePhase,
    /// Action in the current betting round.
    pub action: PlayerAction,
}

impl Seat {
    fn new(address: Address, position: usize) -> Self {
        Self {
            address,
            position,
            phase: GamePhase::PlayerReady,
            action: PlayerAction::None,
        }
    }
}

impl From<&Seat> for SeatView {
    fn from(seat: &Seat) -> Self {
        Self {
            position: seat.position,
            address: seat.address.clone(),
            phase: seat.phase,
            action: seat.action,
        }
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Clockwise,
    CounterClockwise,
}

/// The seat map.
#[derive(Clone, Debug)]
pub struct Table {
    seats: Vec<Option<Seat>>,
}

impl Table {
    #[must_use]
    pub fn new(max_seats: usize) -> Self {
        Self {
            seats: vec![None; max_seats],
        }
    }

    #[must_use]
    pub fn max_seats(&self) -> usize {
        self.seats.len()
    }

    #[must_use]
    pub fn len_players(&self) -> usize {
        self.seats.iter().flatten().count()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len_players() == self.max_seats()
    }

    /// Seated players in position order.
    pub fn players(&self) -> impl Iterator<Item = &Seat> {
        self.seats.iter().flatten()
    }

    #[must_use]
    pub fn contains(&self, addr: &Address) -> bool {
        self.position_of(addr).is_some()
    }

    #[must_use]
    pub fn position_of(&self, addr: &Address) -> Option<usize> {
        self.players()
            .find(|seat| &seat.address == addr)
            .map(|seat| seat.position)
    }

    pub fn get_player(&self, addr: &Address) -> Result<&Seat, GameError> {
        self.players()
            .find(|seat| &seat.address == addr)
            .ok_or_else(|| GameError::PlayerNotFound(addr.clone()))
    }

    fn get_player_mut(&mut self, addr: &Address) -> Result<&mut Seat, GameError> {
        self.seats
            .iter_mut()
            .flatten()
            .find(|seat| &seat.address == addr)
            .ok_or_else(|| GameError::PlayerNotFound(addr.clone()))
    }

    /// Seat `addr` in the first free position, returning that position.
    /// A player that is already seated keeps its seat.
    pub fn add_player(&mut self, addr: &Address) -> Result<usize, GameError> {
        if let Some(position) = self.position_of(addr) {
            return Ok(position);
        }

        let position = self
            .seats
            .iter()
            .position(Option::is_none)
            .ok_or(GameError::TableFull)?;
        self.seats[position] = Some(Seat::new(addr.clone(), position));
        Ok(position)
    }

    /// Seat `addr` at an explicit position.
    pub fn add_player_at(&mut self, addr: &Address, position: usize) -> Result<(), GameError> {
        if let Some(current) = self.position_of(addr) {
            return if current == position {
                Ok(())
            } else {
                Err(GameError::InvalidSeat(position))
            };
        }

        if self.is_full() {
            return Err(GameError::TableFull);
        }

        let slot = self
            .seats
            .get_mut(position)
            .ok_or(GameError::InvalidSeat(position))?;
        if slot.is_some() {
            return Err(GameError::InvalidSeat(position));
        }
        *slot = Some(Seat::new(addr.clone(), position));
        Ok(())
    }

    /// Remove `addr` from the table. Everybody else keeps their position.
    pub fn remove_player(&mut self, addr: &Address) -> Result<Seat, GameError> {
        let position = self
            .position_of(addr)
            .ok_or_else(|| GameError::PlayerNotFound(addr.clone()))?;
        self.seats[position]
            .take()
            .ok_or_else(|| GameError::PlayerNotFound(addr.clone()))
    }

    /// The occupied seat immediately counter-clockwise of `addr`.
    pub fn before(&self, addr: &Address) -> Result<&Seat, GameError> {
        self.neighbor(addr, Direction::CounterClockwise)
    }

    /// The occupied seat immediately clockwise of `addr`.
    pub fn after(&self, addr: &Address) -> Result<&Seat, GameError> {
        self.neighbor(addr, Direction::Clockwise)
    }

    fn neighbor(&self, addr: &Address, direction: Direction) -> Result<&Seat, GameError> {
        let start = self.get_player(addr)?.position;
        let max_seats = self.max_seats();

        let mut i = start;
        loop {
            i = match direction {
                Direction::Clockwise => (i + 1) % max_seats,
                Direction::CounterClockwise => (i + max_seats - 1) % max_seats,
            };
            if i == start {
                return Err(GameError::SoleOccupant(addr.clone()));
            }
            if let Some(seat) = &self.seats[i] {
                return Ok(seat);
            }
        }
    }

    pub fn set_player_phase(&mut self, addr: &Address, phase: GamePhase) -> Result<(), GameError> {
        self.get_player_mut(addr)?.phase = phase;
        Ok(())
    }

    pub fn set_player_action(
        &mut self,
        addr: &Address,
        action: PlayerAction,
    ) -> Result<(), GameError> {
        self.get_player_mut(addr)?.action = action;
        Ok(())
    }

    /// Reset every seat's action for a new betting round.
    pub fn reset_actions(&mut self) {
        for seat in self.seats.iter_mut().flatten() {
            seat.action = PlayerAction::None;
        }
    }

    pub fn set_all_phases(&mut self, phase: GamePhase) {
        for seat in self.seats.iter_mut().flatten() {
            seat.phase = phase;
        }
    }

    pub fn clear(&mut self) {
        self.seats.iter_mut().for_each(|slot| *slot = None);
    }

    #[must_use]
    pub fn views(&self) -> Vec<SeatView> {
        self.players().map(SeatView::from).collect()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .players()
            .map(|seat| {
                format!(
                    "[{} {} {} {}]",
                    seat.position, seat.address, seat.phase, seat.action
                )
            })
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    #[test]
    fn before_wraps_around() {
        let mut table = Table::new(6);
        table.add_player(&addr("1")).unwrap();
        table.add_player(&addr("2")).unwrap();

        assert_eq!(table.before(&addr("2")).unwrap().address, addr("1"));
        assert_eq!(table.before(&addr("1")).unwrap().address, addr("2"));
    }

    #[test]
    fn after_skips_holes() {
        let mut table = Table::new(10);
        table.add_player(&addr("1")).unwrap();
        table.add_player(&addr("2")).unwrap();
        assert_eq!(table.after(&addr("1")).unwrap().address, addr("2"));

        table.add_player(&addr("3")).unwrap();
        table.remove_player(&addr("2")).unwrap();
        assert_eq!(table.after(&addr("1")).unwrap().address, addr("3"));

        table.remove_player(&addr("3")).unwrap();
        assert!(matches!(
            table.after(&addr("1")),
            Err(GameError::SoleOccupant(_))
        ));

        table.add_player(&addr("2")).unwrap();
        assert_eq!(table.after(&addr("2")).unwrap().address, addr("1"));
    }

    #[test]
    fn after_wraps_from_last_seat() {
        let mut table = Table::new(3);
        table.add_player(&addr("1")).unwrap();
        table.add_player(&addr("2")).unwrap();
        table.add_player(&addr("3")).unwrap();

        assert_eq!(table.after(&addr("3")).unwrap().address, addr("1"));
        assert_eq!(table.before(&addr("1")).unwrap().address, addr("3"));
    }

    #[test]
    fn before_skips_seat_zero_holes() {
        let mut table = Table::new(6);
        table.add_player_at(&addr("a"), 1).unwrap();
        table.add_player_at(&addr("b"), 4).unwrap();

        assert_eq!(table.before(&addr("a")).unwrap().address, addr("b"));
        assert_eq!(table.after(&addr("b")).unwrap().address, addr("a"));
    }

    #[test]
    fn sole_occupant_has_no_neighbors() {
        let mut table = Table::new(6);
        table.add_player_at(&addr("a"), 5).unwrap();

        assert!(matches!(
            table.before(&addr("a")),
            Err(GameError::SoleOccupant(_))
        ));
        assert!(matches!(
            table.after(&addr("a")),
            Err(GameError::SoleOccupant(_))
        ));
    }

    #[test]
    fn neighbors_of_unknown_player() {
        let mut table = Table::new(6);
        table.add_player(&addr("a")).unwrap();
        assert!(matches!(
            table.after(&addr("ghost")),
            Err(GameError::PlayerNotFound(_))
        ));
    }

    #[test]
    fn remove_player() {
        let mut table = Table::new(10);
        for i in 0..10 {
            let a = addr(&i.to_string());
            table.add_player(&a).unwrap();
            table.remove_player(&a).unwrap();
            assert!(table.get_player(&a).is_err());
        }
        assert_eq!(table.len_players(), 0);
    }

    #[test]
    fn removing_keeps_other_positions() {
        let mut table = Table::new(6);
        for name in ["a", "b", "c", "d"] {
            table.add_player(&addr(name)).unwrap();
        }
        table.remove_player(&addr("b")).unwrap();

        assert_eq!(table.position_of(&addr("a")), Some(0));
        assert_eq!(table.position_of(&addr("c")), Some(2));
        assert_eq!(table.position_of(&addr("d")), Some(3));

        // The hole is reused by the next auto-seated player.
        assert_eq!(table.add_player(&addr("e")).unwrap(), 1);
    }

    #[test]
    fn add_player_to_full_table() {
        let mut table = Table::new(2);
        table.add_player(&addr(":1")).unwrap();
        table.add_player(&addr(":2")).unwrap();
        assert_eq!(table.len_players(), 2);

        assert!(matches!(
            table.add_player(&addr(":3")),
            Err(GameError::TableFull)
        ));
        assert!(matches!(
            table.add_player_at(&addr(":3"), 0),
            Err(GameError::TableFull)
        ));
        assert_eq!(table.len_players(), 2);
    }

    #[test]
    fn one_seat_per_address() {
        let mut table = Table::new(6);
        assert_eq!(table.add_player(&addr("a")).unwrap(), 0);
        assert_eq!(table.add_player(&addr("a")).unwrap(), 0);
        assert!(table.add_player_at(&addr("a"), 0).is_ok());
        assert!(matches!(
            table.add_player_at(&addr("a"), 3),
            Err(GameError::InvalidSeat(3))
        ));
        assert_eq!(table.len_players(), 1);
    }

    #[test]
    fn add_player_at_taken_or_missing_seat() {
        let mut table = Table::new(3);
        table.add_player_at(&addr("a"), 1).unwrap();
        assert!(matches!(
            table.add_player_at(&addr("b"), 1),
            Err(GameError::InvalidSeat(1))
        ));
        assert!(matches!(
            table.add_player_at(&addr("b"), 7),
            Err(GameError::InvalidSeat(7))
        ));
    }

    #[test]
    fn get_player() {
        let mut table = Table::new(10);
        for i in 0..10 {
            let a = addr(&i.to_string());
            table.add_player(&a).unwrap();
            assert_eq!(table.get_player(&a).unwrap().address, a);
        }
        assert_eq!(table.len_players(), 10);
    }

    #[test]
    fn set_player_phase_and_action() {
        let mut table = Table::new(6);
        table.add_player(&addr("a")).unwrap();
        table.set_player_phase(&addr("a"), GamePhase::Dealing).unwrap();
        table
            .set_player_action(&addr("a"), PlayerAction::Bet(10))
            .unwrap();

        let seat = table.get_player(&addr("a")).unwrap();
        assert_eq!(seat.phase, GamePhase::Dealing);
        assert_eq!(seat.action, PlayerAction::Bet(10));

        table.reset_actions();
        assert_eq!(
            table.get_player(&addr("a")).unwrap().action,
            PlayerAction::None
        );

        assert!(matches!(
            table.set_player_phase(&addr("b"), GamePhase::Flop),
            Err(GameError::PlayerNotFound(_))
        ));
    }

    #[test]
    fn display_lists_seats_in_order() {
        let mut table = Table::new(6);
        table.add_player_at(&addr(":4000"), 2).unwrap();
        table.add_player_at(&addr(":3000"), 0).unwrap();
        assert_eq!(
            table.to_string(),
            "[0 :3000 PLAYER READY NONE] [2 :4000 PLAYER READY NONE]"
        );
    }
}
