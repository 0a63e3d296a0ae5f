//! 点検レコードに対するマーキング操作（CLI用）
//!
//! レコードを読み込んでセッションを組み立て、操作後の保存要求をファイルへ流す。

use crate::error::{DamageReportError, Result};
use crate::record::{flush_events, InspectionRecord, RecordFileSink};
use damage_report_common::{
    synthesize, CanvasPoint, DamageForm, DamageType, DescriptionPolicy, MarkerId, MarkingSession,
    PointerEvent, ScreenPos, ScreenRect, Severity, CANVAS_HEIGHT, CANVAS_WIDTH,
};
use dialoguer::{Input, Select};
use std::path::{Path, PathBuf};

/// 損傷の位置
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    /// 図面の表示サイズ (幅, 高さ)。指定時は x/y を画面ピクセルとして扱う
    pub rendered: Option<(f64, f64)>,
}

/// 損傷の分類（未指定の項目は対話入力または既定値）
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub damage_type: Option<DamageType>,
    pub severity: Option<Severity>,
    pub description: Option<String>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.damage_type.is_none() && self.severity.is_none() && self.description.is_none()
    }

    fn apply_to(&self, form: &mut DamageForm) {
        if let Some(damage_type) = self.damage_type {
            form.damage_type = damage_type;
        }
        if let Some(severity) = self.severity {
            form.severity = severity;
        }
        if let Some(description) = &self.description {
            form.description = description.clone();
        }
    }
}

/// 開いている点検レコード
pub struct Inspection {
    path: PathBuf,
    subject_id: Option<String>,
    session: MarkingSession,
    sink: RecordFileSink,
}

impl Inspection {
    /// レコードを開く（ファイルが無ければ空のレコード）
    pub fn open(path: &Path, policy: DescriptionPolicy) -> Result<Self> {
        let record = InspectionRecord::load_or_default(path)?;
        log::debug!(
            "opened {} ({} markers)",
            path.display(),
            record.markers.len()
        );
        let session = MarkingSession::new(record.session_init(policy, false));
        let sink = RecordFileSink::new(path, record.subject_id.clone());
        Ok(Self {
            path: path.to_path_buf(),
            subject_id: record.subject_id,
            session,
            sink,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn subject_id(&self) -> Option<&str> {
        self.subject_id.as_deref()
    }

    /// 車両IDを差し替える（以後の保存にも反映）
    pub fn set_subject_id(&mut self, subject_id: String) {
        self.sink = RecordFileSink::new(&self.path, Some(subject_id.clone()));
        self.subject_id = Some(subject_id);
    }

    pub fn session(&self) -> &MarkingSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MarkingSession {
        &mut self.session
    }

    pub fn sink(&self) -> &RecordFileSink {
        &self.sink
    }

    /// 溜まった保存要求をファイルへ流す
    pub fn flush(&mut self) -> usize {
        flush_events(&mut self.session, &self.sink)
    }

    /// 表示用の点検メモ
    pub fn notes(&self, regenerate: bool) -> String {
        if regenerate {
            synthesize(self.session.store().iter())
        } else {
            self.session.notes().text().to_string()
        }
    }

    /// 図面上の位置から分類フォームを開く
    fn open_form(&mut self, placement: Placement) -> Result<()> {
        if !(placement.x.is_finite() && placement.y.is_finite()) {
            return Err(DamageReportError::InvalidPosition(format!(
                "({}, {})",
                placement.x, placement.y
            )));
        }

        self.session.toggle_marking()?;
        match placement.rendered {
            Some((width, height)) => {
                self.session
                    .resize_surface(ScreenRect::new(0.0, 0.0, width, height));
                let pos = ScreenPos::new(placement.x, placement.y);
                self.session.handle_pointer(PointerEvent::Down(pos));
                if !self.session.handle_pointer(PointerEvent::Up(pos)) {
                    return Err(DamageReportError::InvalidPosition(format!(
                        "表示サイズ {}x{} では位置を決められません",
                        width, height
                    )));
                }
            }
            None => {
                let point = CanvasPoint::new(
                    placement.x.clamp(0.0, CANVAS_WIDTH),
                    placement.y.clamp(0.0, CANVAS_HEIGHT),
                );
                self.session.capture_point(point)?;
            }
        }
        Ok(())
    }

    /// 損傷を追加して保存する
    pub fn add_marker(
        &mut self,
        placement: Placement,
        classification: &Classification,
        interactive: bool,
    ) -> Result<MarkerId> {
        self.open_form(placement)?;
        let required = !self.session.can_commit();
        if let Some(form) = self.session.form_mut() {
            classification.apply_to(form);
            if interactive {
                prompt_missing(form, classification, required)?;
            }
        }
        let id = self.session.commit()?;
        self.flush();
        Ok(id)
    }

    /// 既存の損傷を編集して保存する
    ///
    /// 対話モードで何も指定されていなければ全項目を現在値から入力させる。
    pub fn update_marker(
        &mut self,
        id: &MarkerId,
        classification: &Classification,
        interactive: bool,
    ) -> Result<()> {
        self.session.select_marker(id)?;
        if let Some(form) = self.session.form_mut() {
            classification.apply_to(form);
            if interactive && classification.is_empty() {
                prompt_missing(form, classification, false)?;
            }
        }
        self.session.commit()?;
        self.flush();
        Ok(())
    }

    /// 損傷を削除して保存する。存在しなければ false
    pub fn delete_marker(&mut self, id: &MarkerId) -> Result<bool> {
        let removed = self.session.delete_marker(id)?;
        self.flush();
        Ok(removed)
    }

    /// すべての損傷と点検メモを消去して保存する
    pub fn clear(&mut self) -> Result<()> {
        self.session.clear_all()?;
        self.flush();
        Ok(())
    }
}

/// 未指定の分類項目を対話入力する
fn prompt_missing(
    form: &mut DamageForm,
    given: &Classification,
    description_required: bool,
) -> Result<()> {
    println!(
        "\n📍 {} Damage ({:.0}, {:.0})",
        form.verb(),
        form.x,
        form.y
    );

    if given.damage_type.is_none() {
        form.damage_type = prompt_damage_type(form.damage_type)?;
    }
    if given.severity.is_none() {
        form.severity = prompt_severity(form.severity)?;
    }
    if given.description.is_none() || (description_required && form.description.trim().is_empty())
    {
        form.description = prompt_description(&form.description, description_required)?;
    }
    Ok(())
}

fn prompt_damage_type(current: DamageType) -> Result<DamageType> {
    let labels: Vec<String> = DamageType::ALL.iter().map(|t| t.label()).collect();
    let default = DamageType::ALL
        .iter()
        .position(|t| *t == current)
        .unwrap_or(0);

    let selection = Select::new()
        .with_prompt("Damage Type")
        .items(&labels)
        .default(default)
        .interact()
        .map_err(|e| DamageReportError::Prompt(e.to_string()))?;

    Ok(DamageType::ALL[selection])
}

fn prompt_severity(current: Severity) -> Result<Severity> {
    let labels: Vec<&str> = Severity::ALL.iter().map(|s| s.as_str()).collect();
    let default = Severity::ALL
        .iter()
        .position(|s| *s == current)
        .unwrap_or(0);

    let selection = Select::new()
        .with_prompt("Severity")
        .items(&labels)
        .default(default)
        .interact()
        .map_err(|e| DamageReportError::Prompt(e.to_string()))?;

    Ok(Severity::ALL[selection])
}

fn prompt_description(current: &str, required: bool) -> Result<String> {
    let input: String = Input::new()
        .with_prompt("Description")
        .with_initial_text(current)
        .allow_empty(!required)
        .validate_with(|text: &String| -> std::result::Result<(), &str> {
            if required && text.trim().is_empty() {
                Err("説明を入力してください")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .map_err(|e| DamageReportError::Prompt(e.to_string()))?;

    Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_apply_keeps_unset_fields() {
        let mut form = DamageForm {
            marker_id: None,
            x: 1.0,
            y: 2.0,
            damage_type: DamageType::Dented,
            severity: Severity::Major,
            description: "old".into(),
        };
        let given = Classification {
            severity: Some(Severity::Minor),
            ..Default::default()
        };
        given.apply_to(&mut form);

        assert_eq!(form.damage_type, DamageType::Dented);
        assert_eq!(form.severity, Severity::Minor);
        assert_eq!(form.description, "old");
        assert!(!given.is_empty());
        assert!(Classification::default().is_empty());
    }
}
