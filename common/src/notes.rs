//! 点検メモ生成
//!
//! マーカー一覧から定型の点検メモを決定的に生成する。
//! 見出しは (損傷種別, 程度) ごとに、最初に出現した順で並ぶ。

use crate::types::{DamageMarker, DamageType, Severity};
use std::collections::HashMap;

/// 点検メモの文字数の目安（超えても入力は止めない）
pub const NOTES_SOFT_LIMIT: usize = 1000;

const NOTES_HEADER: &str = "PRE-USED VEHICLE CHECK:";
const NO_DESCRIPTION: &str = "[No description provided]";

fn plural(count: usize) -> &'static str {
    if count > 1 {
        "s"
    } else {
        ""
    }
}

/// マーカー一覧から点検メモを生成
///
/// 同じ並びの入力に対しては常にバイト単位で同じ文字列を返す。
/// マーカーが無い場合は空文字列。
pub fn synthesize<'a, I>(markers: I) -> String
where
    I: IntoIterator<Item = &'a DamageMarker>,
{
    let mut groups: Vec<((DamageType, Severity), Vec<&DamageMarker>)> = Vec::new();
    let mut group_index: HashMap<(DamageType, Severity), usize> = HashMap::new();
    let mut type_codes: Vec<DamageType> = Vec::new();
    let mut total = 0usize;

    for marker in markers {
        total += 1;
        let key = (marker.damage_type, marker.severity);
        match group_index.get(&key) {
            Some(&idx) => groups[idx].1.push(marker),
            None => {
                group_index.insert(key, groups.len());
                groups.push((key, vec![marker]));
            }
        }
        if !type_codes.contains(&marker.damage_type) {
            type_codes.push(marker.damage_type);
        }
    }

    if total == 0 {
        return String::new();
    }

    let mut notes = format!("{}\n\n", NOTES_HEADER);

    for ((damage_type, severity), members) in &groups {
        let count = members.len();
        notes.push_str(&format!(
            "{} ({}): {} location{}\n",
            damage_type.label().to_uppercase(),
            severity.as_str().to_uppercase(),
            count,
            plural(count)
        ));

        for (index, marker) in members.iter().enumerate() {
            let description = marker.description.trim();
            let line = if description.is_empty() {
                NO_DESCRIPTION
            } else {
                description
            };
            notes.push_str(&format!("  {}. {}\n", index + 1, line));
        }
        notes.push('\n');
    }

    let codes: Vec<&str> = type_codes.iter().map(|t| t.code()).collect();
    notes.push_str(&format!(
        "SUMMARY: {} total damage marker{} identified across {} damage type{} ({}).",
        total,
        plural(total),
        type_codes.len(),
        plural(type_codes.len()),
        codes.join(", ")
    ));

    notes
}

/// 表示中の点検メモ（手入力による上書きを含む）
///
/// マーカーが変更されると生成結果で置き換えられ、手入力分は失われる。
/// 手入力自体は保存をトリガーしない。
#[derive(Debug, Clone, Default)]
pub struct NotesEditor {
    text: String,
    saving: bool,
}

impl NotesEditor {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            saving: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// マーカー変更後の生成結果で置き換え
    pub fn replace_synthesized(&mut self, text: String) {
        self.text = text;
    }

    /// 手入力。保存中表示は即座に解除する
    pub fn edit(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.saving = false;
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_over_limit(&self) -> bool {
        self.char_count() > NOTES_SOFT_LIMIT
    }

    /// 文字数表示（"123/1000"）
    pub fn limit_label(&self) -> String {
        format!("{}/{}", self.char_count(), NOTES_SOFT_LIMIT)
    }

    pub fn begin_saving(&mut self) {
        self.saving = true;
    }

    pub fn finish_saving(&mut self) {
        self.saving = false;
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarkerId;

    fn marker(id: &str, damage_type: DamageType, severity: Severity, desc: &str) -> DamageMarker {
        DamageMarker {
            id: MarkerId::new(id),
            x: 0.0,
            y: 0.0,
            damage_type,
            severity,
            description: desc.to_string(),
        }
    }

    #[test]
    fn test_synthesize_empty() {
        let markers: Vec<DamageMarker> = Vec::new();
        assert_eq!(synthesize(&markers), "");
    }

    #[test]
    fn test_synthesize_reference_example() {
        let markers = vec![
            marker("1", DamageType::Scratched, Severity::Minor, "scratch on door"),
            marker("2", DamageType::Dented, Severity::Moderate, "dent on fender"),
            marker("3", DamageType::Scratched, Severity::Minor, ""),
        ];

        let expected = "PRE-USED VEHICLE CHECK:\n\
            \n\
            S - SCRATCHED (MINOR): 2 locations\n  \
            1. scratch on door\n  \
            2. [No description provided]\n\
            \n\
            D - DENTED (MODERATE): 1 location\n  \
            1. dent on fender\n\
            \n\
            SUMMARY: 3 total damage markers identified across 2 damage types (S, D).";

        assert_eq!(synthesize(&markers), expected);
    }

    #[test]
    fn test_synthesize_single_marker_singular() {
        let markers = vec![marker("1", DamageType::Rust, Severity::Major, "  sill  ")];
        let notes = synthesize(&markers);

        assert!(notes.contains("RU - RUST (MAJOR): 1 location\n"));
        assert!(notes.contains("  1. sill\n"));
        assert!(notes.ends_with(
            "SUMMARY: 1 total damage marker identified across 1 damage type (RU)."
        ));
    }

    #[test]
    fn test_synthesize_whitespace_description_is_placeholder() {
        let markers = vec![marker("1", DamageType::Cut, Severity::Minor, "   ")];
        assert!(synthesize(&markers).contains("  1. [No description provided]\n"));
    }

    #[test]
    fn test_synthesize_same_type_different_severity() {
        let markers = vec![
            marker("1", DamageType::Dented, Severity::Minor, "a"),
            marker("2", DamageType::Dented, Severity::Major, "b"),
        ];
        let notes = synthesize(&markers);

        assert!(notes.contains("D - DENTED (MINOR): 1 location"));
        assert!(notes.contains("D - DENTED (MAJOR): 1 location"));
        assert!(notes.ends_with("across 1 damage type (D)."));
    }

    #[test]
    fn test_synthesize_is_idempotent() {
        let markers = vec![
            marker("1", DamageType::PaintChip, Severity::Minor, "bonnet"),
            marker("2", DamageType::Stained, Severity::Moderate, ""),
            marker("3", DamageType::PaintChip, Severity::Minor, "roof"),
        ];
        assert_eq!(synthesize(&markers), synthesize(&markers));
    }

    #[test]
    fn test_synthesize_group_order_follows_first_seen() {
        let scratch = marker("1", DamageType::Scratched, Severity::Minor, "a");
        let bent = marker("2", DamageType::Bent, Severity::Minor, "b");

        let forward = synthesize(&vec![scratch.clone(), bent.clone()]);
        let reversed = synthesize(&vec![bent, scratch]);

        assert!(forward.find("S - SCRATCHED").unwrap() < forward.find("B - BENT").unwrap());
        assert!(reversed.find("B - BENT").unwrap() < reversed.find("S - SCRATCHED").unwrap());
        assert!(forward.ends_with("(S, B)."));
        assert!(reversed.ends_with("(B, S)."));
    }

    #[test]
    fn test_notes_editor_edit_clears_saving() {
        let mut editor = NotesEditor::new("generated");
        editor.begin_saving();
        assert!(editor.is_saving());

        editor.edit("manual");
        assert_eq!(editor.text(), "manual");
        assert!(!editor.is_saving());
    }

    #[test]
    fn test_notes_editor_soft_limit() {
        let mut editor = NotesEditor::default();
        editor.edit("x".repeat(NOTES_SOFT_LIMIT));
        assert!(!editor.is_over_limit());
        assert_eq!(editor.limit_label(), "1000/1000");

        editor.edit("x".repeat(NOTES_SOFT_LIMIT + 1));
        assert!(editor.is_over_limit());
        assert_eq!(editor.text().len(), NOTES_SOFT_LIMIT + 1);
    }

    #[test]
    fn test_notes_editor_counts_chars() {
        let editor = NotesEditor::new("傷あり");
        assert_eq!(editor.char_count(), 3);
    }
}
