//! Vote count aggregation and percentage math.

use std::collections::HashSet;

use uuid::Uuid;

use crate::models::{OptionResult, OptionStats, Vote, VoteStats};

/// Sum vote counts and attach each option's share of the total.
///
/// Percentages are `round(count / total * 100)`, or 0 for every option when
/// no votes have been cast. Input order and fields are preserved.
pub fn calculate_vote_stats(options: &[OptionResult]) -> VoteStats {
    let total_votes: i64 = options.iter().map(|option| option.vote_count).sum();

    let options = options
        .iter()
        .map(|option| OptionStats {
            percentage: if total_votes > 0 {
                (option.vote_count as f64 / total_votes as f64 * 100.0).round() as i64
            } else {
                0
            },
            option: option.clone(),
        })
        .collect();

    VoteStats {
        total_votes,
        options,
    }
}

/// Drop option ids the voter has already voted for, preserving selection order.
pub fn filter_unvoted_options(selected: &[Uuid], existing_votes: &[Vote]) -> Vec<Uuid> {
    let voted: HashSet<Uuid> = existing_votes.iter().map(|vote| vote.option_id).collect();
    selected
        .iter()
        .copied()
        .filter(|option_id| !voted.contains(option_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn option(text: &str, vote_count: i64) -> OptionResult {
        OptionResult {
            id: Uuid::new_v4(),
            poll_id: Uuid::new_v4(),
            text: text.to_string(),
            created_at: Utc::now(),
            vote_count,
        }
    }

    fn vote_for(option_id: Uuid) -> Vote {
        Vote {
            id: Uuid::new_v4(),
            poll_id: Uuid::new_v4(),
            option_id,
            user_id: Some("voter".to_string()),
            voter_email: None,
            voter_name: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn three_to_one_splits_75_25() {
        let options = [option("a", 3), option("b", 1)];
        let stats = calculate_vote_stats(&options);
        assert_eq!(stats.total_votes, 4);
        assert_eq!(stats.options[0].percentage, 75);
        assert_eq!(stats.options[1].percentage, 25);
    }

    #[test]
    fn zero_votes_gives_zero_percentages() {
        let options = [option("a", 0), option("b", 0)];
        let stats = calculate_vote_stats(&options);
        assert_eq!(stats.total_votes, 0);
        assert!(stats.options.iter().all(|o| o.percentage == 0));
    }

    #[test]
    fn empty_input_yields_empty_stats() {
        let stats = calculate_vote_stats(&[]);
        assert_eq!(stats.total_votes, 0);
        assert!(stats.options.is_empty());
    }

    #[test]
    fn preserves_order_and_fields() {
        let options = [option("first", 1), option("second", 2), option("third", 0)];
        let stats = calculate_vote_stats(&options);
        for (input, output) in options.iter().zip(&stats.options) {
            assert_eq!(*input, output.option);
        }
    }

    #[test]
    fn recomputation_is_stable() {
        let options = [option("a", 7), option("b", 3), option("c", 2)];
        assert_eq!(
            calculate_vote_stats(&options),
            calculate_vote_stats(&options)
        );
    }

    #[test]
    fn percentages_sum_close_to_100() {
        let options = [option("a", 1), option("b", 1), option("c", 1)];
        let stats = calculate_vote_stats(&options);
        let sum: i64 = stats.options.iter().map(|o| o.percentage).sum();
        assert!((sum - 100).abs() <= stats.options.len() as i64);
    }

    #[test]
    fn filter_drops_voted_options_keeping_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let existing = [vote_for(b)];
        assert_eq!(filter_unvoted_options(&[a, b, c], &existing), vec![a, c]);
    }

    #[test]
    fn filter_with_no_existing_votes_keeps_everything() {
        let selected = [Uuid::new_v4(), Uuid::new_v4()];
        assert_eq!(filter_unvoted_options(&selected, &[]), selected.to_vec());
    }
}
