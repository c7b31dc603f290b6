//! Input policy applied before the tracker sees a new buffer.

/// Outcome of checking a proposed input buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputVerdict {
    Accepted,
    /// Grew by more than one char and the added text does not match the target
    SuspectedPaste,
}

/// Decide whether `proposed` may replace `current` while typing `target`.
///
/// Single-char growth, deletions and same-length edits always pass. Larger growth
/// passes only when the added suffix equals the target text at that position.
pub fn check_input_change(current: &str, proposed: &str, target: &str) -> InputVerdict {
    let current_len = current.chars().count();
    let proposed_len = proposed.chars().count();

    if proposed_len <= current_len + 1 {
        return InputVerdict::Accepted;
    }

    let added = proposed.chars().skip(current_len);
    let expected = target.chars().skip(current_len).take(proposed_len - current_len);

    if added.eq(expected) && target.chars().count() >= proposed_len {
        InputVerdict::Accepted
    } else {
        InputVerdict::SuspectedPaste
    }
}

/// Clipboard paste actions are never allowed
pub fn check_paste(_pasted: &str) -> InputVerdict {
    InputVerdict::SuspectedPaste
}
