/// Words and emoji that make the client throw confetti.
const CELEBRATION_TERMS: [&str; 19] = [
    "awesome",
    "amazing",
    "congrats",
    "congratulations",
    "woohoo",
    "woo",
    "yay",
    "great",
    "fantastic",
    "excellent",
    "best friend",
    "bestie",
    "legend",
    "🎉",
    "🎊",
    "✨",
    "🌟",
    "⭐",
    "🔥",
];

/// Case-insensitive substring match, so "GREAT!!" and "greatest" both count.
pub fn is_celebratory(content: &str) -> bool {
    let lowered = content.to_lowercase();
    CELEBRATION_TERMS.iter().any(|term| lowered.contains(term))
}
