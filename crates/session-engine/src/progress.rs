//! Simulated reading position.
//!
//! Each page turn moves the reported percentage forward by a small random
//! step, walks the content pointer, rotates the position markers and, every
//! `chapter_threshold` percentage points, moves to the next chapter. The
//! last turn is remembered so it can be undone if the very next submission
//! is rejected.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::payload::Payload;

/// Characters of the original marker kept as the stable token prefix.
const POSITION_PREFIX_LEN: usize = 16;

/// Reading position as reported to the remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Percent complete, always within `[0, 100]`.
    pub percent_complete: f64,
    pub chapter_index: u32,
    pub content_pointer: u64,
    /// Percent at which the chapter last changed.
    pub last_chapter_advance_percent: f64,
    pub current_position: String,
    pub previous_position: String,
}

impl ProgressState {
    /// Seed the reading position from the bootstrap payload.
    pub fn from_payload(payload: &Payload) -> Self {
        let percent = f64::from(payload.progress).clamp(0.0, 100.0);
        Self {
            percent_complete: percent,
            chapter_index: payload.chapter_index,
            content_pointer: payload.content_offset,
            last_chapter_advance_percent: percent,
            current_position: payload.current_position.clone(),
            previous_position: payload.previous_position.clone(),
        }
    }

    /// Write the position into the payload's position fields.
    ///
    /// These fields are signed, so any digest is stripped first.
    pub fn apply_to(&self, payload: &mut Payload) {
        payload.strip_digest();
        payload.chapter_index = self.chapter_index;
        payload.content_offset = self.content_pointer;
        payload.progress = self.percent_complete.floor() as u32;
        payload.current_position = self.current_position.clone();
        payload.previous_position = self.previous_position.clone();
    }
}

/// How page turns are drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressPolicy {
    /// Smallest increment per turn, in percentage points.
    pub min_increment: f64,
    /// Largest increment per turn, in percentage points.
    pub max_increment: f64,
    /// Percentage points between chapter changes.
    pub chapter_threshold: f64,
    /// Highest chapter index the reader may reach.
    pub max_chapter: u32,
    /// Probability that a successful attempt is followed by a turn.
    pub page_turn_probability: f64,
    /// Content pointer units per percentage point.
    pub offset_per_percent: u64,
}

impl Default for ProgressPolicy {
    fn default() -> Self {
        Self {
            min_increment: 0.5,
            max_increment: 3.0,
            chapter_threshold: 10.0,
            max_chapter: 200,
            page_turn_probability: 0.6,
            offset_per_percent: 40,
        }
    }
}

/// Opaque marker for a content pointer, keeping the prefix of the previous
/// marker so tokens stay recognisable across a session.
pub fn position_token(previous: &str, pointer: u64) -> String {
    let prefix: String = previous.chars().take(POSITION_PREFIX_LEN).collect();
    format!("{}{:07x}", prefix, pointer & 0x0fff_ffff)
}

/// Draw one page turn. Returns the new position and whether the percentage
/// actually moved (false once the reader is at 100).
pub fn advance<R: Rng + ?Sized>(
    state: &ProgressState,
    policy: &ProgressPolicy,
    rng: &mut R,
) -> (ProgressState, bool) {
    let mut next = state.clone();
    if state.percent_complete >= 100.0 {
        return (next, false);
    }

    let lo = policy.min_increment.min(policy.max_increment).max(0.0);
    let hi = policy.min_increment.max(policy.max_increment).max(0.0);
    let increment = if hi > lo { rng.gen_range(lo..=hi) } else { lo };

    next.percent_complete = (state.percent_complete + increment).min(100.0);
    let gained = next.percent_complete - state.percent_complete;

    let step = (gained * policy.offset_per_percent as f64).round().max(1.0) as u64;
    next.content_pointer = state.content_pointer.saturating_add(step);
    next.previous_position = state.current_position.clone();
    next.current_position = position_token(&state.current_position, next.content_pointer);

    if next.percent_complete - state.last_chapter_advance_percent >= policy.chapter_threshold
        && next.chapter_index < policy.max_chapter
    {
        next.chapter_index += 1;
        next.last_chapter_advance_percent = next.percent_complete;
    }

    let page_changed = next.percent_complete > state.percent_complete;
    (next, page_changed)
}

/// Undo a page turn by restoring the snapshot taken before it.
pub fn rollback(_state: &ProgressState, snapshot: &ProgressState) -> ProgressState {
    snapshot.clone()
}

/// The most recent page turn.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTurn {
    /// Attempt index after which the turn happened.
    pub attempt_index: u64,
    /// Position before the turn.
    pub before: ProgressState,
}

/// Owner of the reading position. Other components read it through
/// accessors and never mutate it directly.
#[derive(Debug, Clone)]
pub struct ProgressModel {
    state: ProgressState,
    original: ProgressState,
    policy: ProgressPolicy,
    last_turn: Option<PageTurn>,
}

impl ProgressModel {
    pub fn new(initial: ProgressState, policy: ProgressPolicy) -> Self {
        Self {
            original: initial.clone(),
            state: initial,
            policy,
            last_turn: None,
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn policy(&self) -> &ProgressPolicy {
        &self.policy
    }

    pub fn last_turn(&self) -> Option<&PageTurn> {
        self.last_turn.as_ref()
    }

    /// Decide whether this cycle turns a page.
    pub fn should_turn<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen_bool(self.policy.page_turn_probability.clamp(0.0, 1.0))
    }

    /// Turn a page after `attempt_index` succeeded, remembering the prior
    /// position for rollback.
    pub fn turn_page<R: Rng + ?Sized>(&mut self, attempt_index: u64, rng: &mut R) -> bool {
        let (next, page_changed) = advance(&self.state, &self.policy, rng);
        if page_changed {
            self.last_turn = Some(PageTurn {
                attempt_index,
                before: self.state.clone(),
            });
            self.state = next;
        }
        page_changed
    }

    /// Undo the last turn if `failed_attempt_index` is within one attempt
    /// of it. The snapshot is consumed either way.
    pub fn rollback_if_recent(&mut self, failed_attempt_index: u64) -> bool {
        match self.last_turn.take() {
            Some(turn) if failed_attempt_index.abs_diff(turn.attempt_index) <= 1 => {
                self.state = rollback(&self.state, &turn.before);
                true
            }
            _ => false,
        }
    }

    /// Return to the start-of-session position.
    pub fn reset(&mut self) {
        self.state = self.original.clone();
        self.last_turn = None;
    }

    /// Write the current position into the payload.
    pub fn apply_to(&self, payload: &mut Payload) {
        self.state.apply_to(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn state_at(percent: f64) -> ProgressState {
        ProgressState {
            percent_complete: percent,
            chapter_index: 3,
            content_pointer: 400,
            last_chapter_advance_percent: percent,
            current_position: "6bd322007a623fe8g01005f".to_string(),
            previous_position: "272326e07a623fe7g018361".to_string(),
        }
    }

    #[test]
    fn test_advance_never_exceeds_100() {
        let mut rng = StdRng::seed_from_u64(7);
        let policy = ProgressPolicy::default();
        let mut state = state_at(95.0);

        for _ in 0..50 {
            let (next, _) = advance(&state, &policy, &mut rng);
            assert!(next.percent_complete <= 100.0);
            assert!(next.percent_complete >= state.percent_complete);
            state = next;
        }
        assert_eq!(state.percent_complete, 100.0);
    }

    #[test]
    fn test_advance_at_100_is_not_a_page_change() {
        let mut rng = StdRng::seed_from_u64(1);
        let state = state_at(100.0);
        let (next, changed) = advance(&state, &ProgressPolicy::default(), &mut rng);
        assert!(!changed);
        assert_eq!(next, state);
    }

    #[test]
    fn test_advance_increment_within_policy() {
        let mut rng = StdRng::seed_from_u64(99);
        let policy = ProgressPolicy::default();
        for _ in 0..100 {
            let state = state_at(10.0);
            let (next, changed) = advance(&state, &policy, &mut rng);
            let step = next.percent_complete - state.percent_complete;
            assert!(changed);
            assert!((0.5..=3.0).contains(&step), "step {step}");
        }
    }

    #[test]
    fn test_advance_rotates_position_markers() {
        let mut rng = StdRng::seed_from_u64(3);
        let state = state_at(20.0);
        let (next, _) = advance(&state, &ProgressPolicy::default(), &mut rng);

        assert_eq!(next.previous_position, state.current_position);
        assert_ne!(next.current_position, state.current_position);
        assert!(next.current_position.starts_with("6bd322007a623fe8"));
        assert!(next.content_pointer > state.content_pointer);
    }

    #[test]
    fn test_chapter_advances_once_per_threshold() {
        let mut rng = StdRng::seed_from_u64(11);
        let policy = ProgressPolicy::default();
        let mut state = state_at(0.0);
        let mut previous_chapter = state.chapter_index;

        for _ in 0..60 {
            let (next, _) = advance(&state, &policy, &mut rng);
            assert!(next.chapter_index - previous_chapter <= 1);
            if next.chapter_index != previous_chapter {
                assert!(next.percent_complete - state.last_chapter_advance_percent >= 10.0);
            }
            previous_chapter = next.chapter_index;
            state = next;
        }
        assert!(state.chapter_index > 3);
    }

    #[test]
    fn test_chapter_bounded_by_max() {
        let mut rng = StdRng::seed_from_u64(5);
        let policy = ProgressPolicy {
            max_chapter: 3,
            ..Default::default()
        };
        let mut state = state_at(0.0);
        for _ in 0..80 {
            state = advance(&state, &policy, &mut rng).0;
        }
        assert_eq!(state.chapter_index, 3);
    }

    #[test]
    fn test_rollback_within_one_attempt() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut model = ProgressModel::new(state_at(40.0), ProgressPolicy::default());

        assert!(model.turn_page(4, &mut rng));
        assert!(model.state().percent_complete > 40.0);

        assert!(model.rollback_if_recent(5));
        assert_eq!(model.state(), &state_at(40.0));
        assert!(model.last_turn().is_none());
    }

    #[test]
    fn test_rollback_refused_for_unrelated_failure() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut model = ProgressModel::new(state_at(40.0), ProgressPolicy::default());

        model.turn_page(4, &mut rng);
        let turned = model.state().clone();

        assert!(!model.rollback_if_recent(7));
        assert_eq!(model.state(), &turned);
        assert!(!model.rollback_if_recent(5));
    }

    #[test]
    fn test_reset_restores_original() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut model = ProgressModel::new(state_at(10.0), ProgressPolicy::default());
        for attempt in 1..10 {
            model.turn_page(attempt, &mut rng);
        }
        model.reset();
        assert_eq!(model.state(), &state_at(10.0));
    }

    #[test]
    fn test_apply_to_strips_digest() {
        let mut payload = Payload::default();
        payload.digest = Some("stale".to_string());

        let state = state_at(42.7);
        state.apply_to(&mut payload);

        assert!(payload.digest.is_none());
        assert_eq!(payload.progress, 42);
        assert_eq!(payload.chapter_index, 3);
        assert_eq!(payload.content_offset, 400);
    }

    #[test]
    fn test_should_turn_respects_extremes() {
        let mut rng = StdRng::seed_from_u64(0);
        let never = ProgressModel::new(
            state_at(0.0),
            ProgressPolicy {
                page_turn_probability: 0.0,
                ..Default::default()
            },
        );
        let always = ProgressModel::new(
            state_at(0.0),
            ProgressPolicy {
                page_turn_probability: 1.0,
                ..Default::default()
            },
        );
        for _ in 0..20 {
            assert!(!never.should_turn(&mut rng));
            assert!(always.should_turn(&mut rng));
        }
    }
}
