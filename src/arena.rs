//! Arena match engine
//!
//! Plays an iterated prisoner's dilemma between two chatbots. Each round both
//! models are prompted with the match history and asked for a one-word move;
//! replies are parsed with simple keyword matching and an unparseable reply
//! counts as a defection, with the raw text preserved for the viewer. Rounds
//! and running totals persist as they complete so the match can be polled
//! mid-game. A provider error fails the whole match.

use crate::config::Config;
use crate::dispatch::timed_call;
use crate::metrics::Metrics;
use crate::models::{ArenaMatch, ArenaMove, ArenaRound, Chatbot, MatchStatus};
use crate::providers::{ChatMessage, ProviderRegistry};
use crate::store::{Database, queries};
use chrono::Utc;
use std::sync::Arc;

/// Upper bound on rounds per match, enforced at creation time
pub const MAX_ROUNDS: u32 = 25;

/// Payoff for one round, (points_a, points_b)
pub fn payoff(move_a: ArenaMove, move_b: ArenaMove) -> (u32, u32) {
    match (move_a, move_b) {
        (ArenaMove::Cooperate, ArenaMove::Cooperate) => (3, 3),
        (ArenaMove::Defect, ArenaMove::Defect) => (1, 1),
        (ArenaMove::Cooperate, ArenaMove::Defect) => (0, 5),
        (ArenaMove::Defect, ArenaMove::Cooperate) => (5, 0),
    }
}

/// Parse a model reply into a move
///
/// Case-insensitive keyword scan; when both keywords appear, the first
/// mention wins. Returns None for replies naming neither move.
pub fn parse_move(reply: &str) -> Option<ArenaMove> {
    let lower = reply.to_lowercase();
    let cooperate = lower.find("cooperate");
    let defect = lower.find("defect");
    match (cooperate, defect) {
        (Some(c), Some(d)) => Some(if c < d {
            ArenaMove::Cooperate
        } else {
            ArenaMove::Defect
        }),
        (Some(_), None) => Some(ArenaMove::Cooperate),
        (None, Some(_)) => Some(ArenaMove::Defect),
        (None, None) => None,
    }
}

/// Build the per-round prompt for one player
///
/// Prompts are self-contained: the rules plus this player's view of the
/// history, rather than an accumulated chat transcript.
fn build_move_messages(rounds: &[ArenaRound], next_round: u32, plays_a: bool) -> Vec<ChatMessage> {
    let mut user = String::new();
    if rounds.is_empty() {
        user.push_str("This is the first round.");
    } else {
        user.push_str("Previous rounds:\n");
        for round in rounds {
            let (own, opponent, own_score, opponent_score) = if plays_a {
                (round.move_a, round.move_b, round.score_a, round.score_b)
            } else {
                (round.move_b, round.move_a, round.score_b, round.score_a)
            };
            user.push_str(&format!(
                "Round {}: you played {}, opponent played {} (you scored {}, opponent scored {})\n",
                round.round,
                own.as_str().to_uppercase(),
                opponent.as_str().to_uppercase(),
                own_score,
                opponent_score
            ));
        }
    }
    user.push_str(&format!("\nRound {}. Your move?", next_round));

    vec![
        ChatMessage::system(
            "You are playing an iterated prisoner's dilemma. Each round, reply with \
            exactly one word: COOPERATE or DEFECT. Payoffs per round: both cooperate \
            3/3, both defect 1/1, a defector against a cooperator scores 5/0.",
        ),
        ChatMessage::user(user),
    ]
}

/// Executes arena matches in the background
pub struct ArenaEngine {
    config: Arc<Config>,
    registry: Arc<ProviderRegistry>,
    store: Arc<Database>,
    metrics: Metrics,
}

impl ArenaEngine {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<ProviderRegistry>,
        store: Arc<Database>,
        metrics: Metrics,
    ) -> Self {
        Self {
            config,
            registry,
            store,
            metrics,
        }
    }

    /// Start executing a pending match in the background
    pub fn spawn_match(self: &Arc<Self>, arena_match: ArenaMatch) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let match_id = arena_match.id.clone();
            engine.execute_match(arena_match).await;
            tracing::debug!(match_id = %match_id, "Match task finished");
        });
    }

    async fn execute_match(self: Arc<Self>, arena_match: ArenaMatch) {
        tracing::info!(
            match_id = %arena_match.id,
            chatbot_a = %arena_match.chatbot_a,
            chatbot_b = %arena_match.chatbot_b,
            rounds_total = arena_match.rounds_total,
            "Starting arena match"
        );

        self.persist_status(&arena_match.id, MatchStatus::Running, None, None);

        let (Some(bot_a), Some(bot_b)) = (
            self.config.chatbot(&arena_match.chatbot_a).cloned(),
            self.config.chatbot(&arena_match.chatbot_b).cloned(),
        ) else {
            self.fail_match(
                &arena_match.id,
                "chatbot disappeared from catalog between match creation and start",
            );
            return;
        };

        let mut rounds: Vec<ArenaRound> = Vec::with_capacity(arena_match.rounds_total as usize);
        for round in 1..=arena_match.rounds_total {
            let (reply_a, reply_b) = tokio::join!(
                self.ask_for_move(&bot_a, &rounds, round, true),
                self.ask_for_move(&bot_b, &rounds, round, false),
            );

            let (raw_a, raw_b) = match (reply_a, reply_b) {
                (Ok(a), Ok(b)) => (a, b),
                (Err(reason), _) | (_, Err(reason)) => {
                    self.fail_match(&arena_match.id, &reason);
                    return;
                }
            };

            // Unparseable replies count as defection; the raw text stays
            // visible so the viewer can judge for itself.
            let move_a = parse_move(&raw_a).unwrap_or(ArenaMove::Defect);
            let move_b = parse_move(&raw_b).unwrap_or(ArenaMove::Defect);
            let (score_a, score_b) = payoff(move_a, move_b);

            let record = ArenaRound {
                round,
                move_a,
                move_b,
                score_a,
                score_b,
                raw_a,
                raw_b,
            };

            if let Err(e) = self
                .store
                .with_connection(|conn| queries::append_round(conn, &arena_match.id, &record))
            {
                tracing::debug!(
                    match_id = %arena_match.id,
                    round = round,
                    error = %e,
                    "Dropping round write (match deleted mid-flight?)"
                );
                return;
            }

            tracing::debug!(
                match_id = %arena_match.id,
                round = round,
                move_a = move_a.as_str(),
                move_b = move_b.as_str(),
                "Round completed"
            );
            rounds.push(record);
        }

        self.persist_status(&arena_match.id, MatchStatus::Completed, None, Some(Utc::now()));
        if let Err(e) = self.metrics.record_match_outcome(MatchStatus::Completed) {
            tracing::error!(match_id = %arena_match.id, error = %e, "Metrics recording failed (non-fatal)");
        }

        let (total_a, total_b) = rounds
            .iter()
            .fold((0u32, 0u32), |(a, b), r| (a + r.score_a, b + r.score_b));
        tracing::info!(
            match_id = %arena_match.id,
            score_a = total_a,
            score_b = total_b,
            "Arena match finished"
        );
    }

    async fn ask_for_move(
        &self,
        bot: &Chatbot,
        rounds: &[ArenaRound],
        next_round: u32,
        plays_a: bool,
    ) -> Result<String, String> {
        let Some(backend) = self.registry.backend(bot.provider()) else {
            return Err(format!(
                "no backend registered for provider {}",
                bot.provider()
            ));
        };

        let messages = build_move_messages(rounds, next_round, plays_a);
        let (outcome, _latency_ms) =
            timed_call(&backend, bot, &messages, &self.config, &self.metrics).await;
        outcome.map_err(|reason| format!("{}: {}", bot.id(), reason))
    }

    fn fail_match(&self, match_id: &str, reason: &str) {
        tracing::warn!(match_id = %match_id, error = %reason, "Arena match failed");
        self.persist_status(
            match_id,
            MatchStatus::Failed,
            Some(reason),
            Some(Utc::now()),
        );
        if let Err(e) = self.metrics.record_match_outcome(MatchStatus::Failed) {
            tracing::error!(match_id = %match_id, error = %e, "Metrics recording failed (non-fatal)");
        }
    }

    fn persist_status(
        &self,
        match_id: &str,
        status: MatchStatus,
        error: Option<&str>,
        completed_at: Option<chrono::DateTime<Utc>>,
    ) {
        if let Err(e) = self.store.with_connection(|conn| {
            queries::set_match_status(conn, match_id, status, error, completed_at)
        }) {
            tracing::warn!(
                match_id = %match_id,
                status = status.as_str(),
                error = %e,
                "Failed to persist match status"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payoff_matrix() {
        assert_eq!(payoff(ArenaMove::Cooperate, ArenaMove::Cooperate), (3, 3));
        assert_eq!(payoff(ArenaMove::Defect, ArenaMove::Defect), (1, 1));
        assert_eq!(payoff(ArenaMove::Cooperate, ArenaMove::Defect), (0, 5));
        assert_eq!(payoff(ArenaMove::Defect, ArenaMove::Cooperate), (5, 0));
    }

    #[test]
    fn test_parse_move_single_keyword() {
        assert_eq!(parse_move("COOPERATE"), Some(ArenaMove::Cooperate));
        assert_eq!(parse_move("defect"), Some(ArenaMove::Defect));
        assert_eq!(parse_move("I choose to Cooperate."), Some(ArenaMove::Cooperate));
        assert_eq!(
            parse_move("My move this round is: DEFECT!"),
            Some(ArenaMove::Defect)
        );
    }

    #[test]
    fn test_parse_move_first_mention_wins() {
        assert_eq!(
            parse_move("Cooperate. I will not defect."),
            Some(ArenaMove::Cooperate)
        );
        assert_eq!(
            parse_move("Defecting beats cooperating here."),
            Some(ArenaMove::Defect)
        );
    }

    #[test]
    fn test_parse_move_unparseable_returns_none() {
        assert_eq!(parse_move("I refuse to answer."), None);
        assert_eq!(parse_move(""), None);
    }

    #[test]
    fn test_build_move_messages_first_round() {
        let messages = build_move_messages(&[], 1, true);
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("first round"));
        assert!(messages[1].content.contains("Round 1. Your move?"));
    }

    #[test]
    fn test_build_move_messages_swaps_perspective() {
        let rounds = vec![ArenaRound {
            round: 1,
            move_a: ArenaMove::Cooperate,
            move_b: ArenaMove::Defect,
            score_a: 0,
            score_b: 5,
            raw_a: "COOPERATE".to_string(),
            raw_b: "DEFECT".to_string(),
        }];

        let for_a = build_move_messages(&rounds, 2, true);
        assert!(
            for_a[1]
                .content
                .contains("you played COOPERATE, opponent played DEFECT")
        );
        assert!(for_a[1].content.contains("you scored 0"));

        let for_b = build_move_messages(&rounds, 2, false);
        assert!(
            for_b[1]
                .content
                .contains("you played DEFECT, opponent played COOPERATE")
        );
        assert!(for_b[1].content.contains("you scored 5"));
    }
}
