use rand::Rng;
use rand::seq::SliceRandom;

const ADJECTIVES: [&str; 18] = [
    "Mysterious", "Cosmic", "Dreamy", "Starry", "Lunar", "Midnight", "Twilight", "Shadow", "Silent",
    "Whispering", "Wandering", "Lost", "Sleepless", "Nocturnal", "Evening", "Phantom", "Ghost",
    "Spirit",
];

const NOUNS: [&str; 18] = [
    "Owl", "Moon", "Star", "Night", "Dream", "Soul", "Traveler", "Thinker", "Wanderer", "Seeker",
    "Mind", "Spirit", "Heart", "Voice", "Whisper", "Echo", "Shadow", "Light",
];

const STARTERS: [&str; 20] = [
    "What's keeping you up tonight?",
    "If you could travel anywhere right now, where would you go?",
    "What's your favorite late-night snack?",
    "What's the last thing that made you laugh?",
    "If you could have dinner with anyone, who would it be?",
    "What's your guilty pleasure?",
    "What's the best advice you've ever received?",
    "If you could learn any skill instantly, what would it be?",
    "What's your favorite movie or show right now?",
    "What's something you're grateful for today?",
    "What's your dream job?",
    "If you could live in any era, which would you choose?",
    "What's your biggest fear?",
    "What makes you feel most alive?",
    "What's something nobody knows about you?",
    "What's your favorite memory?",
    "If you won the lottery, what's the first thing you'd do?",
    "What's your biggest accomplishment?",
    "What are you passionate about?",
    "What's your favorite song right now?",
];

pub const STARTER_COUNT: usize = 5;

/// Adjective + noun + number in 1..=999, e.g. `CosmicOwl42`.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("Silent");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("Owl");
    let number: u16 = rng.gen_range(1..=999);
    format!("{adjective}{noun}{number}")
}

/// A pseudonym different from every name already taken in the chat.
pub fn generate_unique(taken: &[String]) -> String {
    loop {
        let candidate = generate();
        if !taken.contains(&candidate) {
            return candidate;
        }
    }
}

pub fn conversation_starters() -> Vec<String> {
    let mut rng = rand::thread_rng();
    STARTERS.choose_multiple(&mut rng, STARTER_COUNT).map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_name_has_expected_shape() {
        for _ in 0..200 {
            let name = generate();
            let digits: String = name.chars().filter(|c| c.is_ascii_digit()).collect();
            let number: u16 = digits.parse().unwrap();
            assert!((1..=999).contains(&number));

            let prefix = name.trim_end_matches(|c: char| c.is_ascii_digit());
            assert!(ADJECTIVES.iter().any(|adj| {
                prefix.strip_prefix(adj).is_some_and(|rest| NOUNS.contains(&rest))
            }));
        }
    }

    #[test]
    fn test_unique_name_avoids_taken() {
        let taken: Vec<String> = (0..50).map(|_| generate()).collect();
        let fresh = generate_unique(&taken);
        assert!(!taken.contains(&fresh));
    }

    #[test]
    fn test_starters_are_five_distinct_prompts() {
        let starters = conversation_starters();
        assert_eq!(starters.len(), STARTER_COUNT);
        let distinct: HashSet<_> = starters.iter().collect();
        assert_eq!(distinct.len(), STARTER_COUNT);
        assert!(starters.iter().all(|s| STARTERS.contains(&s.as_str())));
    }
}
