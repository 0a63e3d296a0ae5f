//! マーキング操作の状態遷移
//!
//! ```text
//! Idle ──toggle──▶ Marking ──候補点──▶ AwaitingDetails ──commit/cancel──▶ Idle
//!  │  ◀──toggle──                                                          ▲
//!  └──select_marker──▶ EditingExisting ──commit/cancel─────────────────────┘
//! ```
//!
//! マーカーの変更（追加・更新・削除・全消去）のたびに点検メモを再生成し、
//! 永続化メッセージ `SessionEvent::Persist` をキューに積む。ホストは
//! `drain_events` で取り出して保存する。

use crate::canvas::{CanvasPoint, DiagramSurface, PointerEvent, ScreenRect, ViewBox};
use crate::error::MarkingError;
use crate::notes::{synthesize, NotesEditor};
use crate::store::MarkerStore;
use crate::types::{
    DamageMarker, DamageType, MarkerDraft, MarkerId, MarkerPatch, Severity, Snapshot,
};

type MarkingResult<T> = std::result::Result<T, MarkingError>;

/// 操作状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkingState {
    #[default]
    Idle,
    /// 図面が入力を受け付け、候補点を待っている
    Marking,
    /// 新規候補点の分類フォームを表示中
    AwaitingDetails,
    /// 既存マーカーの分類フォームを表示中
    EditingExisting,
}

/// 説明文が空のときに保存を許すか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DescriptionPolicy {
    #[default]
    Required,
    Optional,
}

/// 分類フォームの内容
#[derive(Debug, Clone, PartialEq)]
pub struct DamageForm {
    /// 既存マーカーの編集時のみ Some
    pub marker_id: Option<MarkerId>,
    pub x: f64,
    pub y: f64,
    pub damage_type: DamageType,
    pub severity: Severity,
    pub description: String,
}

impl DamageForm {
    fn new_at(point: CanvasPoint) -> Self {
        Self {
            marker_id: None,
            x: point.x.round(),
            y: point.y.round(),
            damage_type: DamageType::Scratched,
            severity: Severity::Minor,
            description: String::new(),
        }
    }

    fn from_marker(marker: &DamageMarker) -> Self {
        Self {
            marker_id: Some(marker.id.clone()),
            x: marker.x,
            y: marker.y,
            damage_type: marker.damage_type,
            severity: marker.severity,
            description: marker.description.clone(),
        }
    }

    pub fn is_new(&self) -> bool {
        self.marker_id.is_none()
    }

    /// "Add" / "Edit"
    pub fn verb(&self) -> &'static str {
        if self.is_new() {
            "Add"
        } else {
            "Edit"
        }
    }
}

/// ホストへの送信メッセージ
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// 現在の (markers, notes) を保存してほしい
    Persist(Snapshot),
}

/// セッション初期化パラメータ
#[derive(Debug, Clone, Default)]
pub struct SessionInit {
    pub markers: Vec<DamageMarker>,
    pub notes: String,
    pub read_only: bool,
    pub description_policy: DescriptionPolicy,
}

/// マーキングセッション（マーカーストアの唯一の所有者）
#[derive(Debug, Clone)]
pub struct MarkingSession {
    store: MarkerStore,
    notes: NotesEditor,
    surface: DiagramSurface,
    state: MarkingState,
    form: Option<DamageForm>,
    read_only: bool,
    policy: DescriptionPolicy,
    events: Vec<SessionEvent>,
}

impl MarkingSession {
    pub fn new(init: SessionInit) -> Self {
        let store = MarkerStore::from_markers(init.markers);

        // 既存マーカーがありメモが空なら、読み込み時に生成（保存はしない）
        let notes = if !store.is_empty() && init.notes.is_empty() {
            log::debug!("synthesizing notes for {} loaded markers", store.len());
            NotesEditor::new(synthesize(store.iter()))
        } else {
            NotesEditor::new(init.notes)
        };

        Self {
            store,
            notes,
            surface: DiagramSurface::new(ViewBox::default()),
            state: MarkingState::Idle,
            form: None,
            read_only: init.read_only,
            policy: init.description_policy,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> MarkingState {
        self.state
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn store(&self) -> &MarkerStore {
        &self.store
    }

    pub fn notes(&self) -> &NotesEditor {
        &self.notes
    }

    pub fn surface(&self) -> &DiagramSurface {
        &self.surface
    }

    pub fn resize_surface(&mut self, rect: ScreenRect) {
        self.surface.resize(rect);
    }

    pub fn form(&self) -> Option<&DamageForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut DamageForm> {
        self.form.as_mut()
    }

    fn form_open(&self) -> bool {
        matches!(
            self.state,
            MarkingState::AwaitingDetails | MarkingState::EditingExisting
        )
    }

    fn set_state(&mut self, state: MarkingState) {
        if self.state != state {
            log::debug!("marking state {:?} -> {:?}", self.state, state);
        }
        self.state = state;
        self.surface
            .set_active(state == MarkingState::Marking && !self.read_only);
    }

    /// 「損傷をマーク」の切替
    pub fn toggle_marking(&mut self) -> MarkingResult<MarkingState> {
        if self.read_only {
            return Err(MarkingError::ReadOnly);
        }
        match self.state {
            MarkingState::Idle => self.set_state(MarkingState::Marking),
            MarkingState::Marking => self.set_state(MarkingState::Idle),
            MarkingState::AwaitingDetails | MarkingState::EditingExisting => {
                return Err(MarkingError::FormOpen)
            }
        }
        Ok(self.state)
    }

    /// ポインタ入力を図面へ流し、候補点が確定したらフォームを開く
    ///
    /// フォームが開いた場合 true。
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        match self.surface.handle(event) {
            Some(candidate) => self.capture_point(candidate.point).is_ok(),
            None => false,
        }
    }

    /// 候補点を受け取り、既定値入りの分類フォームを開く
    pub fn capture_point(&mut self, point: CanvasPoint) -> MarkingResult<()> {
        if self.read_only {
            return Err(MarkingError::ReadOnly);
        }
        match self.state {
            MarkingState::Marking => {
                self.form = Some(DamageForm::new_at(point));
                self.set_state(MarkingState::AwaitingDetails);
                Ok(())
            }
            MarkingState::AwaitingDetails | MarkingState::EditingExisting => {
                Err(MarkingError::FormOpen)
            }
            MarkingState::Idle => Err(MarkingError::NotIdle),
        }
    }

    /// 既存マーカーを選択して編集フォームを開く（Idle時のみ）
    pub fn select_marker(&mut self, id: &MarkerId) -> MarkingResult<()> {
        if self.read_only {
            return Err(MarkingError::ReadOnly);
        }
        if self.form_open() {
            return Err(MarkingError::FormOpen);
        }
        if self.state != MarkingState::Idle {
            return Err(MarkingError::NotIdle);
        }
        let marker = self
            .store
            .get(id)
            .ok_or_else(|| MarkingError::UnknownMarker(id.to_string()))?;
        self.form = Some(DamageForm::from_marker(marker));
        self.set_state(MarkingState::EditingExisting);
        Ok(())
    }

    /// 保存ボタンが押せるか
    pub fn can_commit(&self) -> bool {
        match &self.form {
            Some(form) => {
                self.policy == DescriptionPolicy::Optional || !form.description.trim().is_empty()
            }
            None => false,
        }
    }

    /// フォームを確定（新規なら追加、編集なら更新）
    pub fn commit(&mut self) -> MarkingResult<MarkerId> {
        if self.read_only {
            return Err(MarkingError::ReadOnly);
        }
        if self.form.is_none() {
            return Err(MarkingError::NoForm);
        }
        if !self.can_commit() {
            return Err(MarkingError::DescriptionRequired);
        }
        let form = self.form.take().ok_or(MarkingError::NoForm)?;

        let id = match form.marker_id {
            None => self.store.add(MarkerDraft {
                id: None,
                x: form.x,
                y: form.y,
                damage_type: form.damage_type,
                severity: form.severity,
                description: form.description,
            }),
            Some(id) => {
                let patch = MarkerPatch {
                    damage_type: Some(form.damage_type),
                    severity: Some(form.severity),
                    description: Some(form.description),
                    ..Default::default()
                };
                if !self.store.update(&id, patch) {
                    self.set_state(MarkingState::Idle);
                    return Err(MarkingError::UnknownMarker(id.to_string()));
                }
                id
            }
        };

        self.set_state(MarkingState::Idle);
        self.after_mutation();
        Ok(id)
    }

    /// フォームを閉じる（変更なし）
    pub fn cancel(&mut self) -> MarkingResult<()> {
        if self.form.take().is_none() {
            return Err(MarkingError::NoForm);
        }
        self.set_state(MarkingState::Idle);
        Ok(())
    }

    /// マーカー削除（Idle時のみ、存在しないIDは何もしない）
    pub fn delete_marker(&mut self, id: &MarkerId) -> MarkingResult<bool> {
        self.ensure_idle_editable()?;
        let removed = self.store.delete(id);
        self.after_mutation();
        Ok(removed)
    }

    /// 全消去。点検メモも空にする
    pub fn clear_all(&mut self) -> MarkingResult<()> {
        self.ensure_idle_editable()?;
        self.store.clear();
        self.notes.clear();
        log::info!("all markers cleared");
        self.queue_persist();
        Ok(())
    }

    /// 点検メモの手入力（保存はしない）
    pub fn edit_notes(&mut self, text: impl Into<String>) -> MarkingResult<()> {
        if self.read_only {
            return Err(MarkingError::ReadOnly);
        }
        self.notes.edit(text);
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            markers: self.store.to_vec(),
            notes: self.notes.text().to_string(),
        }
    }

    /// レポート生成前の保存用スナップショット（保存中表示を開始）
    pub fn begin_render_save(&mut self) -> Snapshot {
        self.notes.begin_saving();
        self.snapshot()
    }

    pub fn finish_render_save(&mut self) {
        self.notes.finish_saving();
    }

    /// 溜まった送信メッセージを取り出す
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    fn ensure_idle_editable(&self) -> MarkingResult<()> {
        if self.read_only {
            return Err(MarkingError::ReadOnly);
        }
        if self.form_open() {
            return Err(MarkingError::FormOpen);
        }
        if self.state != MarkingState::Idle {
            return Err(MarkingError::NotIdle);
        }
        Ok(())
    }

    fn after_mutation(&mut self) {
        self.notes.replace_synthesized(synthesize(self.store.iter()));
        self.queue_persist();
    }

    fn queue_persist(&mut self) {
        self.events.push(SessionEvent::Persist(self.snapshot()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::ScreenPos;

    fn session() -> MarkingSession {
        let mut session = MarkingSession::new(SessionInit::default());
        session.resize_surface(ScreenRect::new(0.0, 0.0, 1000.0, 400.0));
        session
    }

    fn click(session: &mut MarkingSession, x: f64, y: f64) -> bool {
        session.handle_pointer(PointerEvent::Down(ScreenPos::new(x, y)));
        session.handle_pointer(PointerEvent::Up(ScreenPos::new(x, y)))
    }

    fn add_marker(session: &mut MarkingSession, desc: &str) -> MarkerId {
        session.toggle_marking().unwrap();
        assert!(click(session, 500.0, 200.0));
        session.form_mut().unwrap().description = desc.to_string();
        session.commit().unwrap()
    }

    #[test]
    fn test_toggle_marking() {
        let mut session = session();
        assert_eq!(session.toggle_marking().unwrap(), MarkingState::Marking);
        assert!(session.surface().is_active());
        assert_eq!(session.toggle_marking().unwrap(), MarkingState::Idle);
        assert!(!session.surface().is_active());
    }

    #[test]
    fn test_pointer_ignored_while_idle() {
        let mut session = session();
        assert!(!click(&mut session, 100.0, 100.0));
        assert_eq!(session.state(), MarkingState::Idle);
    }

    #[test]
    fn test_candidate_opens_prefilled_form() {
        let mut session = session();
        session.toggle_marking().unwrap();
        assert!(click(&mut session, 500.0, 200.0));

        assert_eq!(session.state(), MarkingState::AwaitingDetails);
        assert!(!session.surface().is_active());
        let form = session.form().unwrap();
        assert!(form.is_new());
        assert_eq!(form.damage_type, DamageType::Scratched);
        assert_eq!(form.severity, Severity::Minor);
        assert_eq!(form.description, "");
        // 1014.5 → 1015, 382.5 → 383
        assert_eq!(form.x, 1015.0);
        assert_eq!(form.y, 383.0);
    }

    #[test]
    fn test_toggle_refused_while_form_open() {
        let mut session = session();
        session.toggle_marking().unwrap();
        click(&mut session, 10.0, 10.0);

        assert_eq!(session.toggle_marking(), Err(MarkingError::FormOpen));
    }

    #[test]
    fn test_commit_adds_marker_and_persists() {
        let mut session = session();
        let id = add_marker(&mut session, "scratch on door");

        assert_eq!(session.state(), MarkingState::Idle);
        assert!(session.store().contains(&id));
        assert!(session.notes().text().contains("S - SCRATCHED (MINOR): 1 location"));

        let events = session.drain_events();
        assert_eq!(events.len(), 1);
        let SessionEvent::Persist(snapshot) = &events[0];
        assert_eq!(snapshot.markers.len(), 1);
        assert_eq!(snapshot.notes, session.notes().text());
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_commit_blocked_without_description() {
        let mut session = session();
        session.toggle_marking().unwrap();
        click(&mut session, 10.0, 10.0);

        assert!(!session.can_commit());
        assert_eq!(session.commit(), Err(MarkingError::DescriptionRequired));
        assert_eq!(session.state(), MarkingState::AwaitingDetails);
        assert!(session.store().is_empty());
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_optional_description_policy() {
        let mut session = MarkingSession::new(SessionInit {
            description_policy: DescriptionPolicy::Optional,
            ..Default::default()
        });
        session.resize_surface(ScreenRect::new(0.0, 0.0, 1000.0, 400.0));
        session.toggle_marking().unwrap();
        click(&mut session, 10.0, 10.0);

        assert!(session.can_commit());
        session.commit().unwrap();
        assert!(session.notes().text().contains("[No description provided]"));
    }

    #[test]
    fn test_cancel_leaves_store_untouched() {
        let mut session = session();
        session.toggle_marking().unwrap();
        click(&mut session, 10.0, 10.0);
        session.form_mut().unwrap().description = "typed".to_string();

        session.cancel().unwrap();
        assert_eq!(session.state(), MarkingState::Idle);
        assert!(session.store().is_empty());
        assert!(session.drain_events().is_empty());
        assert_eq!(session.cancel(), Err(MarkingError::NoForm));
    }

    #[test]
    fn test_select_and_update_existing() {
        let mut session = session();
        let first = add_marker(&mut session, "first");
        add_marker(&mut session, "second");
        session.drain_events();

        session.select_marker(&first).unwrap();
        assert_eq!(session.state(), MarkingState::EditingExisting);
        {
            let form = session.form_mut().unwrap();
            assert!(!form.is_new());
            form.damage_type = DamageType::Dented;
            form.severity = Severity::Major;
        }
        let id = session.commit().unwrap();

        assert_eq!(id, first);
        let markers = session.store().to_vec();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].id, first);
        assert_eq!(markers[0].damage_type, DamageType::Dented);
        assert_eq!(session.drain_events().len(), 1);
    }

    #[test]
    fn test_select_refused_while_marking() {
        let mut session = session();
        let id = add_marker(&mut session, "a");
        session.toggle_marking().unwrap();

        assert_eq!(session.select_marker(&id), Err(MarkingError::NotIdle));
    }

    #[test]
    fn test_select_unknown_marker() {
        let mut session = session();
        assert_eq!(
            session.select_marker(&MarkerId::new("ghost")),
            Err(MarkingError::UnknownMarker("ghost".to_string()))
        );
    }

    #[test]
    fn test_add_then_delete_yields_empty_notes() {
        let mut session = session();
        let id = add_marker(&mut session, "scratch");
        assert!(!session.notes().text().is_empty());

        assert!(session.delete_marker(&id).unwrap());
        assert_eq!(session.notes().text(), "");
        assert_eq!(session.drain_events().len(), 2);

        // 2回目の削除もエラーにならない
        assert!(!session.delete_marker(&id).unwrap());
    }

    #[test]
    fn test_manual_notes_discarded_on_next_mutation() {
        let mut session = session();
        add_marker(&mut session, "first");
        session.drain_events();

        session.edit_notes("hand written").unwrap();
        assert_eq!(session.notes().text(), "hand written");
        assert!(session.drain_events().is_empty());

        add_marker(&mut session, "second");
        assert!(session.notes().text().starts_with("PRE-USED VEHICLE CHECK:"));
    }

    #[test]
    fn test_clear_all_blanks_notes() {
        let mut session = session();
        add_marker(&mut session, "a");
        session.edit_notes("custom").unwrap();
        session.drain_events();

        session.clear_all().unwrap();
        assert!(session.store().is_empty());
        assert_eq!(session.notes().text(), "");
        let events = session.drain_events();
        assert_eq!(events, vec![SessionEvent::Persist(Snapshot::default())]);
    }

    #[test]
    fn test_read_only_blocks_everything() {
        let markers = vec![DamageMarker {
            id: MarkerId::new("m1"),
            x: 1014.0,
            y: 382.0,
            damage_type: DamageType::Rust,
            severity: Severity::Major,
            description: "sill".to_string(),
        }];
        let mut session = MarkingSession::new(SessionInit {
            markers,
            read_only: true,
            ..Default::default()
        });
        session.resize_surface(ScreenRect::new(0.0, 0.0, 1000.0, 400.0));

        assert_eq!(session.toggle_marking(), Err(MarkingError::ReadOnly));
        assert!(!click(&mut session, 500.0, 200.0));
        assert_eq!(
            session.capture_point(CanvasPoint::new(1.0, 1.0)),
            Err(MarkingError::ReadOnly)
        );
        assert_eq!(session.select_marker(&MarkerId::new("m1")), Err(MarkingError::ReadOnly));
        assert!(session.form().is_none());
        assert_eq!(session.delete_marker(&MarkerId::new("m1")), Err(MarkingError::ReadOnly));
        assert_eq!(session.edit_notes("x"), Err(MarkingError::ReadOnly));
        assert_eq!(session.store().len(), 1);
    }

    #[test]
    fn test_initial_markers_synthesize_notes_without_persist() {
        let markers = vec![DamageMarker {
            id: MarkerId::new("a"),
            x: 0.0,
            y: 0.0,
            damage_type: DamageType::Dented,
            severity: Severity::Minor,
            description: "boot lid".to_string(),
        }];
        let mut session = MarkingSession::new(SessionInit {
            markers,
            ..Default::default()
        });

        assert!(session.notes().text().contains("D - DENTED (MINOR): 1 location"));
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_initial_markers_with_same_id_are_not_merged() {
        let marker = |description: &str| DamageMarker {
            id: MarkerId::new("1712345678901"),
            x: 100.0,
            y: 100.0,
            damage_type: DamageType::Scratched,
            severity: Severity::Minor,
            description: description.to_string(),
        };
        let session = MarkingSession::new(SessionInit {
            markers: vec![marker("door"), marker("bonnet")],
            ..Default::default()
        });

        assert_eq!(session.store().len(), 2);
        assert!(session.notes().text().contains("  1. door\n  2. bonnet"));
        assert_eq!(session.snapshot().markers.len(), 2);
    }

    #[test]
    fn test_initial_notes_are_kept() {
        let session = MarkingSession::new(SessionInit {
            markers: vec![DamageMarker {
                id: MarkerId::new("a"),
                x: 0.0,
                y: 0.0,
                damage_type: DamageType::Dented,
                severity: Severity::Minor,
                description: String::new(),
            }],
            notes: "saved earlier".to_string(),
            ..Default::default()
        });
        assert_eq!(session.notes().text(), "saved earlier");
    }

    #[test]
    fn test_render_save_indicator() {
        let mut session = session();
        add_marker(&mut session, "a");
        session.edit_notes("manual notes").unwrap();

        let snapshot = session.begin_render_save();
        assert_eq!(snapshot.notes, "manual notes");
        assert!(session.notes().is_saving());

        session.edit_notes("typing").unwrap();
        assert!(!session.notes().is_saving());
    }
}
