use crate::domain::member::UserId;
use crate::domain::thread::MessageSummary;
use crate::help::catalog::ThreadActivity;

/// Classifies a thread from its recent history. Only messages by someone other
/// than the author, and not by a bot, count as help received.
pub fn determine_activity(
    author: &UserId,
    recent_messages: &[MessageSummary],
    high_threshold: usize,
) -> ThreadActivity {
    let helper_messages = recent_messages
        .iter()
        .filter(|message| !message.author_is_bot && &message.author_id != author)
        .count();

    match helper_messages {
        0 => ThreadActivity::Low,
        count if count >= high_threshold => ThreadActivity::High,
        _ => ThreadActivity::Medium,
    }
}
