pub struct Icons;

impl Icons {
    pub const CARDS: &str = "🃏";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const LINK: &str = "🔗";
    pub const SWORDS: &str = "⚔️";
    pub const DATABASE: &str = "🗄️";
    pub const GEAR: &str = "⚙️";
    pub const UP: &str = "⬆️";
    pub const DOWN: &str = "⬇️";
    pub const SWAP: &str = "🔄";
    pub const BULB: &str = "💡";
}
