//! Shared UI icons and emojis.
//!
//! Each icon falls back to a plain ASCII marker on terminals without emoji support.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[WARN]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
pub static BULLET: Emoji<'_, '_> = Emoji("• ", "- ");

// Sequence indicators
pub static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
pub static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "");

// Phase indicators
pub static FOUNDATION: Emoji<'_, '_> = Emoji("🏛️  ", "[1]");
pub static ORCHESTRATION: Emoji<'_, '_> = Emoji("🔱 ", "[2]");
pub static SKILLS: Emoji<'_, '_> = Emoji("⚡ ", "[3]");
pub static INTELLIGENCE: Emoji<'_, '_> = Emoji("🧠 ", "[4]");
pub static CONFIGURATION: Emoji<'_, '_> = Emoji("👑 ", "[5]");
pub static MONITORING: Emoji<'_, '_> = Emoji("📊 ", "[6]");

// Summary sections
pub static METRICS: Emoji<'_, '_> = Emoji("📊 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static BOOKS: Emoji<'_, '_> = Emoji("📚 ", "");
