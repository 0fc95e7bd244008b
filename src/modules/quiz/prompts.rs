use rand::seq::SliceRandom;

use crate::modules::quiz::schema::{QuizKind, TruthOrDare};

pub struct QuizPrompt {
    pub kind: QuizKind,
    pub question: String,
    pub options: Vec<String>,
}

const WOULD_YOU_RATHER: &str = "Would you rather...";

const RANDOM_QUIZZES: [(QuizKind, &str, &[&str]); 10] = [
    (QuizKind::WouldYouRather, WOULD_YOU_RATHER, &["Have the ability to fly", "Be invisible"]),
    (QuizKind::WouldYouRather, WOULD_YOU_RATHER, &["Live without music", "Live without movies"]),
    (QuizKind::WouldYouRather, WOULD_YOU_RATHER, &["Be able to speak all languages", "Talk to animals"]),
    (QuizKind::WouldYouRather, WOULD_YOU_RATHER, &["Time travel to the past", "Time travel to the future"]),
    (QuizKind::WouldYouRather, WOULD_YOU_RATHER, &["Have unlimited money", "Have unlimited free time"]),
    (QuizKind::Emoji, "How are you feeling right now?", &["😊", "😎", "🥳", "😌", "🤔", "😴"]),
    (
        QuizKind::Custom,
        "What's your favorite late-night snack?",
        &["Pizza", "Ice Cream", "Chips", "Fruit", "Nothing"],
    ),
    (
        QuizKind::Custom,
        "What's keeping you up tonight?",
        &["Can't sleep", "Work/Study", "Just chilling", "Watching something", "Thinking"],
    ),
    (
        QuizKind::Custom,
        "What would you do with a million dollars?",
        &["Travel the world", "Buy a house", "Invest it", "Give to charity", "Save it"],
    ),
    (
        QuizKind::Custom,
        "What superpower would you want?",
        &["Flying", "Invisibility", "Time travel", "Mind reading", "Super strength"],
    ),
];

const TRUTHS: [&str; 15] = [
    "What's your biggest fear?",
    "What's the most embarrassing thing you've done?",
    "Who was your first crush?",
    "What's a secret you've never told anyone?",
    "What's your biggest regret?",
    "What's the weirdest dream you've ever had?",
    "What's something you're ashamed of?",
    "Who do you have a crush on right now?",
    "What's the biggest lie you've ever told?",
    "What's your guilty pleasure?",
    "What's something you're afraid to admit?",
    "What's the worst thing you've done?",
    "What's your most embarrassing moment?",
    "What's something you wish you could change about yourself?",
    "What's your darkest secret?",
];

const DARES: [&str; 15] = [
    "Do 20 push-ups right now",
    "Post an embarrassing photo on social media",
    "Text your crush 'I like you'",
    "Eat a spoonful of hot sauce",
    "Dance with no music for 1 minute",
    "Call a random contact and sing to them",
    "Do your best celebrity impression",
    "Speak in an accent for the next 10 minutes",
    "Let someone else read your last 5 text messages",
    "Post a story saying 'I'm bored, someone entertain me'",
    "Send a screenshot of your search history",
    "Call your mom and tell her you love her",
    "Do 50 jumping jacks",
    "Sing your favorite song out loud",
    "Do your best dance move",
];

const TRUTH_OPTIONS: [&str; 4] = ["Yes", "No", "Maybe", "I prefer not to answer"];
const DARE_OPTIONS: [&str; 4] = ["Did it! ✓", "Skip 😅", "Maybe later", "Challenge accepted!"];

fn owned(options: &[&str]) -> Vec<String> {
    options.iter().map(|o| o.to_string()).collect()
}

pub fn random_quiz() -> QuizPrompt {
    let mut rng = rand::thread_rng();
    let (kind, question, options) = RANDOM_QUIZZES.choose(&mut rng).copied().unwrap_or(RANDOM_QUIZZES[0]);
    QuizPrompt { kind, question: question.to_string(), options: owned(options) }
}

pub fn truth_or_dare(choice: TruthOrDare) -> QuizPrompt {
    let mut rng = rand::thread_rng();
    let (pool, prefix, options): (&[&str], &str, &[&str]) = match choice {
        TruthOrDare::Truth => (&TRUTHS[..], "TRUTH", &TRUTH_OPTIONS[..]),
        TruthOrDare::Dare => (&DARES[..], "DARE", &DARE_OPTIONS[..]),
    };
    let prompt = pool.choose(&mut rng).copied().unwrap_or(pool[0]);

    QuizPrompt {
        kind: QuizKind::TruthOrDare,
        question: format!("{prefix}: {prompt}"),
        options: owned(options),
    }
}
