use super::types::Tag;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
	#[default]
	Idle,
	Searching,
	Showing,
	Selected,
}

/// Keys the dropdown reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavKey {
	Down,
	Up,
	Enter,
	Escape,
}

impl NavKey {
	pub fn from_key(key: &str) -> Option<Self> {
		match key {
			"ArrowDown" => Some(NavKey::Down),
			"ArrowUp" => Some(NavKey::Up),
			"Enter" => Some(NavKey::Enter),
			"Escape" => Some(NavKey::Escape),
			_ => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum KeyOutcome {
	/// Not ours; let the browser handle it.
	PassThrough,
	/// Consumed; the caller should prevent the default action.
	Handled,
	/// A candidate was picked.
	Commit(Tag),
}

/// A search the component should run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchTicket {
	pub query: String,
	pub generation: u64,
}

/// Dropdown state for one input.
///
/// Each search gets a generation number and only the response to the most
/// recent one is applied, so a slow stale response cannot overwrite newer
/// candidates.
#[derive(Clone, Debug, Default)]
pub struct AutocompleteState {
	pub phase: Phase,
	pub candidates: Vec<Tag>,
	pub cursor: Option<usize>,
	generation: u64,
}

impl AutocompleteState {
	pub fn is_open(&self) -> bool {
		self.phase == Phase::Showing && !self.candidates.is_empty()
	}

	/// Starts a search for `raw`, or closes the dropdown for blank input.
	pub fn begin_search(&mut self, raw: &str) -> Option<SearchTicket> {
		self.generation += 1;
		let query = raw.trim();
		if query.is_empty() {
			self.hide();
			return None;
		}
		self.phase = Phase::Searching;
		Some(SearchTicket {
			query: query.to_string(),
			generation: self.generation,
		})
	}

	/// Returns false when the response was stale and ignored.
	pub fn apply_results(&mut self, generation: u64, tags: Vec<Tag>) -> bool {
		if generation != self.generation {
			return false;
		}
		self.candidates = tags;
		self.cursor = None;
		self.phase = if self.candidates.is_empty() {
			Phase::Idle
		} else {
			Phase::Showing
		};
		true
	}

	pub fn apply_failure(&mut self, generation: u64) -> bool {
		if generation != self.generation {
			return false;
		}
		self.hide();
		true
	}

	/// Closes the dropdown and invalidates any search still in flight.
	pub fn hide(&mut self) {
		self.generation += 1;
		self.phase = Phase::Idle;
		self.cursor = None;
	}

	pub fn on_key(&mut self, key: NavKey) -> KeyOutcome {
		if !self.is_open() {
			return KeyOutcome::PassThrough;
		}
		let len = self.candidates.len();
		match key {
			NavKey::Down => {
				self.cursor = Some(self.cursor.map_or(0, |i| (i + 1) % len));
				KeyOutcome::Handled
			}
			NavKey::Up => {
				self.cursor = Some(self.cursor.map_or(len - 1, |i| (i + len - 1) % len));
				KeyOutcome::Handled
			}
			NavKey::Enter => match self.cursor {
				Some(i) => self.select(i).map_or(KeyOutcome::Handled, KeyOutcome::Commit),
				None => {
					self.hide();
					KeyOutcome::PassThrough
				}
			},
			NavKey::Escape => {
				self.hide();
				KeyOutcome::PassThrough
			}
		}
	}

	/// Picks candidate `index`. The caller clears the input and then calls
	/// [`AutocompleteState::hide`] to get back to idle.
	pub fn select(&mut self, index: usize) -> Option<Tag> {
		let tag = self.candidates.get(index).cloned()?;
		self.phase = Phase::Selected;
		self.cursor = None;
		Some(tag)
	}

	/// Selects `index`, hands the tag to `on_select`, clears `input` and
	/// closes the dropdown.
	pub fn commit(&mut self, index: usize, input: &mut String, on_select: impl FnOnce(Tag)) -> bool {
		let Some(tag) = self.select(index) else {
			return false;
		};
		on_select(tag);
		input.clear();
		self.hide();
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tag(name: &str) -> Tag {
		Tag {
			name: name.into(),
			category: "症狀".into(),
			color: None,
		}
	}

	fn showing(names: &[&str]) -> AutocompleteState {
		let mut state = AutocompleteState::default();
		let ticket = state.begin_search("x").unwrap();
		state.apply_results(ticket.generation, names.iter().map(|n| tag(n)).collect());
		state
	}

	#[test]
	fn blank_query_goes_idle_without_search() {
		let mut state = showing(&["a"]);
		assert!(state.begin_search("   ").is_none());
		assert_eq!(state.phase, Phase::Idle);
	}

	#[test]
	fn empty_results_stay_idle() {
		let mut state = AutocompleteState::default();
		let ticket = state.begin_search("zz").unwrap();
		assert_eq!(state.phase, Phase::Searching);
		assert!(state.apply_results(ticket.generation, vec![]));
		assert_eq!(state.phase, Phase::Idle);
	}

	#[test]
	fn arrow_down_cycles_back_to_start() {
		let mut state = showing(&["a", "b", "c"]);
		state.on_key(NavKey::Down);
		let start = state.cursor;
		for _ in 0..3 {
			assert_eq!(state.on_key(NavKey::Down), KeyOutcome::Handled);
		}
		assert_eq!(state.cursor, start);
	}

	#[test]
	fn arrow_up_wraps_to_last() {
		let mut state = showing(&["a", "b", "c"]);
		state.on_key(NavKey::Up);
		assert_eq!(state.cursor, Some(2));
		state.on_key(NavKey::Down);
		assert_eq!(state.cursor, Some(0));
		state.on_key(NavKey::Up);
		assert_eq!(state.cursor, Some(2));
	}

	#[test]
	fn enter_with_cursor_commits_once() {
		let mut state = showing(&["a", "b"]);
		state.on_key(NavKey::Down);
		state.on_key(NavKey::Down);
		assert_eq!(state.on_key(NavKey::Enter), KeyOutcome::Commit(tag("b")));
		assert_eq!(state.phase, Phase::Selected);
		assert_eq!(state.on_key(NavKey::Enter), KeyOutcome::PassThrough);
		state.hide();
		assert_eq!(state.phase, Phase::Idle);
	}

	#[test]
	fn enter_without_cursor_hides_and_passes_through() {
		let mut state = showing(&["a"]);
		assert_eq!(state.on_key(NavKey::Enter), KeyOutcome::PassThrough);
		assert!(!state.is_open());
	}

	#[test]
	fn escape_hides() {
		let mut state = showing(&["a"]);
		state.on_key(NavKey::Escape);
		assert_eq!(state.phase, Phase::Idle);
	}

	#[test]
	fn keys_ignored_while_closed() {
		let mut state = AutocompleteState::default();
		assert_eq!(state.on_key(NavKey::Down), KeyOutcome::PassThrough);
		assert_eq!(state.cursor, None);
	}

	#[test]
	fn stale_responses_are_dropped() {
		let mut state = AutocompleteState::default();
		let first = state.begin_search("ne").unwrap();
		let second = state.begin_search("neck").unwrap();
		assert!(state.apply_results(second.generation, vec![tag("neck")]));
		assert!(!state.apply_results(first.generation, vec![tag("nerve")]));
		assert!(!state.apply_failure(first.generation));
		assert_eq!(state.candidates, vec![tag("neck")]);
		assert!(state.is_open());
	}

	#[test]
	fn response_after_hide_stays_closed() {
		let mut state = AutocompleteState::default();
		let ticket = state.begin_search("neck").unwrap();
		state.hide();
		assert!(!state.apply_results(ticket.generation, vec![tag("neck pain")]));
		assert!(!state.is_open());
		assert!(!state.apply_failure(ticket.generation));
	}

	#[test]
	fn response_after_commit_stays_closed() {
		let mut state = showing(&["a"]);
		let ticket = state.begin_search("ab").unwrap();
		let mut input = "ab".to_string();
		state.apply_results(ticket.generation, vec![tag("ab")]);
		let pending = state.begin_search("abc").unwrap();
		assert!(state.commit(0, &mut input, |_| {}));
		assert!(!state.apply_results(pending.generation, vec![tag("abc")]));
		assert!(!state.is_open());
	}

	#[test]
	fn failure_hides() {
		let mut state = AutocompleteState::default();
		let ticket = state.begin_search("x").unwrap();
		assert!(state.apply_failure(ticket.generation));
		assert_eq!(state.phase, Phase::Idle);
	}

	#[test]
	fn commit_clears_input_and_calls_back_once() {
		let mut state = showing(&["a", "b", "c"]);
		let mut input = String::from("x");
		let mut picked = Vec::new();
		assert!(state.commit(1, &mut input, |t| picked.push(t)));
		assert_eq!(picked, vec![tag("b")]);
		assert!(input.is_empty());
		assert_eq!(state.phase, Phase::Idle);
	}

	#[test]
	fn select_out_of_range_is_none() {
		let mut state = showing(&["a"]);
		assert_eq!(state.select(4), None);
		assert!(state.is_open());
	}
}
