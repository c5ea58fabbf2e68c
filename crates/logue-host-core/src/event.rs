//! Discrete events applied to a unit between render calls.

use logue_abi::{ParamType, UnitDescriptor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One discrete control event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitEvent {
    ParamChange { index: u8, value: i32 },
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    GateOn { velocity: u8 },
    GateOff,
    AllNotesOff,
    PitchBend(u16),
    ChannelPressure(u8),
    Aftertouch { note: u8, pressure: u8 },
    Tempo(u32),
    LoadPreset(u8),
}

impl UnitEvent {
    pub fn is_note(&self) -> bool {
        matches!(
            self,
            Self::NoteOn { .. } | Self::NoteOff { .. } | Self::GateOn { .. } | Self::GateOff | Self::AllNotesOff
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEvent {
    /// Absolute frame the event fires at.
    pub frame: u64,
    pub event: UnitEvent,
}

/// Events ordered by frame. Events sharing a frame keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct EventSchedule {
    events: Vec<ScheduledEvent>,
}

/// Note pattern used when profiling generators: one note per second.
pub const PROFILE_NOTES: [u8; 10] = [60, 64, 67, 72, 55, 62, 69, 48, 76, 52];
pub const PROFILE_VELOCITIES: [u8; 10] = [100, 90, 110, 80, 95, 105, 85, 100, 120, 75];
/// Parameter variations applied while profiling generators, one per second.
pub const PROFILE_VARIATIONS: u32 = 10;
/// Shortest profiling run for a generator; silence follows a shorter input.
pub const GENERATOR_PROFILE_SECS: u32 = 10;

impl EventSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: u64, event: UnitEvent) {
        let at = self.events.partition_point(|e| e.frame <= frame);
        self.events.insert(at, ScheduledEvent { frame, event });
    }

    pub fn with(mut self, frame: u64, event: UnitEvent) -> Self {
        self.push(frame, event);
        self
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScheduledEvent> {
        self.events.iter()
    }

    /// Events firing in `[start, start + frames)`.
    pub fn window(&self, start: u64, frames: u64) -> &[ScheduledEvent] {
        let end = start.saturating_add(frames);
        let lo = self.events.partition_point(|e| e.frame < start);
        let hi = self.events.partition_point(|e| e.frame < end);
        &self.events[lo..hi]
    }

    /// The note sequence a generator is played with: one note per second,
    /// releasing the previous one. Effects get an empty schedule.
    pub fn notes(descriptor: &UnitDescriptor, sample_rate: u32, total_frames: u64) -> Self {
        let mut schedule = Self::new();
        if !descriptor.kind().is_generator() {
            return schedule;
        }
        let second = sample_rate as u64;

        let mut previous = None;
        for (i, (&note, &velocity)) in PROFILE_NOTES.iter().zip(&PROFILE_VELOCITIES).enumerate() {
            let frame = i as u64 * second;
            if frame >= total_frames {
                break;
            }
            if let Some(prev) = previous {
                schedule.push(frame, UnitEvent::NoteOff { note: prev });
            }
            schedule.push(frame, UnitEvent::NoteOn { note, velocity });
            previous = Some(note);
        }
        schedule
    }

    /// Workload for profiling a unit over `total_frames`.
    ///
    /// Generators get the [`notes`](Self::notes) sequence and, from the second
    /// second on, up to ten rounds of 3-5 random in-range parameter changes.
    /// Effects get an empty schedule. `seed` makes the parameter picks
    /// reproducible.
    pub fn profiling(descriptor: &UnitDescriptor, sample_rate: u32, total_frames: u64, seed: u64) -> Self {
        let mut schedule = Self::notes(descriptor, sample_rate, total_frames);
        if !descriptor.kind().is_generator() {
            return schedule;
        }
        let second = sample_rate as u64;

        let candidates: Vec<_> = descriptor
            .params()
            .filter(|(_, p)| p.kind != ParamType::None && p.max > p.min)
            .map(|(i, p)| (i as u8, p.min as i32, p.max as i32))
            .collect();
        if candidates.is_empty() {
            return schedule;
        }

        let mut rng = StdRng::seed_from_u64(seed);
        for round in 1..=PROFILE_VARIATIONS as u64 {
            let frame = round * second;
            if frame >= total_frames {
                break;
            }
            let changes = rng.gen_range(3..=5);
            for _ in 0..changes {
                let (index, min, max) = candidates[rng.gen_range(0..candidates.len())];
                let value = rng.gen_range(min..=max);
                schedule.push(frame, UnitEvent::ParamChange { index, value });
            }
        }
        schedule
    }
}

impl FromIterator<ScheduledEvent> for EventSchedule {
    fn from_iter<I: IntoIterator<Item = ScheduledEvent>>(iter: I) -> Self {
        let mut schedule = Self::new();
        for e in iter {
            schedule.push(e.frame, e.event);
        }
        schedule
    }
}
