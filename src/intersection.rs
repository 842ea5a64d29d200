//! The traffic-intersection synchronizer: a monitor admitting a vehicle
//! only while nothing inside the intersection conflicts with its movement.
//!
//! One lock guards twelve block counters, one per movement class; each
//! class also gets its own condition variable so a departure wakes only
//! the classes it actually unblocks. Admission is greedy and waiters use
//! Mesa re-check loops, so a woken vehicle may find a newly admitted
//! conflict and go back to sleep. Starvation is possible under adversarial
//! arrival patterns; that is accepted here.

use array_macro::array;

use crate::kdebug;
use crate::lock::{Condvar, Sleeplock};
use crate::printf::DbFlags;

/// Compass points a vehicle arrives from or heads to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

/// Number of movement classes: ordered pairs of distinct directions.
pub const NMOVEMENT: usize = 12;

/// A movement class, named origin-then-destination.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Movement {
    NE,
    NS,
    NW,
    EN,
    ES,
    EW,
    SN,
    SE,
    SW,
    WN,
    WE,
    WS,
}

use Movement::*;

/// For each class, every class whose path crosses it. The relation is
/// symmetric; a class never conflicts with itself, and classes sharing an
/// origin never conflict (vehicles from one origin follow each other in).
static CONFLICT: [&[Movement]; NMOVEMENT] = [
    /* NE */ &[ES, EW, SN, SE, SW, WN, WE],
    /* NS */ &[ES, EW, SW, WN, WS, WE],
    /* NW */ &[EW, SW],
    /* EN */ &[SN, WN],
    /* ES */ &[NE, NS, SN, SW, WN, WE, WS],
    /* EW */ &[NE, NS, NW, SN, SW, WN],
    /* SN */ &[NE, EN, ES, EW, WN, WE],
    /* SE */ &[NE, WE],
    /* SW */ &[NE, NS, NW, ES, EW, WN, WE],
    /* WN */ &[NE, NS, EN, ES, EW, SN, SW],
    /* WE */ &[NE, NS, ES, SN, SE, SW],
    /* WS */ &[NS, ES],
];

impl Movement {
    pub const ALL: [Movement; NMOVEMENT] = [NE, NS, NW, EN, ES, EW, SN, SE, SW, WN, WE, WS];

    /// The class of a vehicle arriving from `origin` bound for
    /// `destination`. A vehicle cannot leave the way it came in, so equal
    /// directions are a programming error in the simulation driver.
    pub fn new(origin: Direction, destination: Direction) -> Movement {
        use Direction::*;
        match (origin, destination) {
            (North, East) => NE,
            (North, South) => NS,
            (North, West) => NW,
            (East, North) => EN,
            (East, South) => ES,
            (East, West) => EW,
            (South, North) => SN,
            (South, East) => SE,
            (South, West) => SW,
            (West, North) => WN,
            (West, East) => WE,
            (West, South) => WS,
            (origin, destination) => {
                panic!("invalid movement {:?} -> {:?}", origin, destination)
            }
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Every class that must stay out while a vehicle of this class is
    /// inside.
    pub fn conflicts(self) -> &'static [Movement] {
        CONFLICT[self.index()]
    }
}

/// The intersection monitor.
pub struct Intersection {
    /// block[c] counts admitted vehicles whose class conflicts with c. A
    /// class-c vehicle may enter only on seeing block[c] == 0.
    block: Sleeplock<[u32; NMOVEMENT]>,

    /// One queue of waiting vehicles per class, all waiting against the
    /// block-counter lock.
    waiting: [Condvar; NMOVEMENT],
}

impl Intersection {
    /// Sets up the lock, the per-class queues, and zeroed counters.
    pub fn new() -> Self {
        Self {
            block: Sleeplock::new("intersection", [0; NMOVEMENT]),
            waiting: array![_ => Condvar::new(); NMOVEMENT],
        }
    }

    /// Blocks until the vehicle's movement conflicts with nothing inside,
    /// then claims its path by raising the counter of every conflicting
    /// class.
    pub fn before_entry(&self, origin: Direction, destination: Direction) {
        let movement = Movement::new(origin, destination);
        let mut block = self.block.lock();
        while block[movement.index()] > 0 {
            self.waiting[movement.index()].wait(&mut block);
        }
        for conflict in movement.conflicts() {
            block[conflict.index()] += 1;
        }
        kdebug!(DbFlags::SYNCH, "intersection: {:?} entered", movement);
    }

    /// Releases the vehicle's path and gives each class it was blocking
    /// one wakeup. One signal per class suffices: a woken vehicle that
    /// enters will produce further wakeups when it departs, and one that
    /// finds its class still blocked goes back to sleep.
    pub fn after_exit(&self, origin: Direction, destination: Direction) {
        let movement = Movement::new(origin, destination);
        let mut block = self.block.lock();
        for conflict in movement.conflicts() {
            assert!(
                block[conflict.index()] > 0,
                "after_exit: {:?} was not blocking {:?}",
                movement,
                conflict
            );
            block[conflict.index()] -= 1;
            self.waiting[conflict.index()].signal();
        }
        kdebug!(DbFlags::SYNCH, "intersection: {:?} left", movement);
    }
}

impl Default for Intersection {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Direction::*;
    use super::*;

    #[test]
    fn class_lookup_covers_all_ordered_pairs() {
        let all = [North, East, South, West];
        let mut seen = Vec::new();
        for &origin in &all {
            for &destination in &all {
                if origin != destination {
                    seen.push(Movement::new(origin, destination));
                }
            }
        }
        assert_eq!(seen.len(), NMOVEMENT);
        for movement in Movement::ALL.iter() {
            assert!(seen.contains(movement));
        }
    }

    #[test]
    #[should_panic(expected = "invalid movement")]
    fn a_u_turn_is_a_programming_error() {
        let _ = Movement::new(North, North);
    }

    #[test]
    fn conflict_table_is_symmetric() {
        for &a in Movement::ALL.iter() {
            for &b in a.conflicts() {
                assert!(
                    b.conflicts().contains(&a),
                    "{:?} conflicts with {:?} but not the other way around",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn a_class_never_conflicts_with_itself() {
        for &movement in Movement::ALL.iter() {
            assert!(!movement.conflicts().contains(&movement));
        }
    }

    #[test]
    fn classes_sharing_an_origin_never_conflict() {
        for (i, &a) in Movement::ALL.iter().enumerate() {
            for (j, &b) in Movement::ALL.iter().enumerate() {
                if i / 3 == j / 3 && i != j {
                    assert!(
                        !a.conflicts().contains(&b),
                        "{:?} and {:?} share an origin",
                        a,
                        b
                    );
                }
            }
        }
    }

    #[test]
    fn compatible_movements_enter_without_blocking() {
        let intersection = Intersection::new();
        // Two right turns from opposite origins plus one through movement
        // that crosses neither.
        intersection.before_entry(North, West);
        intersection.before_entry(South, East);
        intersection.before_entry(East, North);
        intersection.after_exit(East, North);
        intersection.after_exit(South, East);
        intersection.after_exit(North, West);
    }
}
