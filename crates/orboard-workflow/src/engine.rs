//! 看板引擎
//!
//! 协调状态机、排房解析与队列协调器的核心引擎。所有修改类操作
//! 都经过同一把看板锁，队列编号与状态变更因此串行化。
//! 变更落盘走仓储端口，操作员确认走确认通道。

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use orboard_core::{
    CaseState, HoldReason, OperativeRecord, OrBoardError, Result, SurgeryCase, SurgeryKind,
};
use orboard_schedule::AssignmentResolver;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::WorkflowConfig;
use crate::countdown::HoldWatcher;
use crate::queue::{MoveDirection, MoveOutcome, QueueCoordinator};
use crate::repository::{CaseRepository, ConfirmationChannel};
use crate::state_machine::{CaseEvent, ReadinessStateMachine};

/// OFF Case 二次确认的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffCaseOutcome {
    /// 操作员确认，病例已终结
    Applied,
    /// 操作员取消，病例维持暂缓
    Declined,
}

/// 看板概况
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardOverview {
    pub total: usize,
    pub ready: usize,
    pub on_hold: usize,
    pub timed_hold: usize,
    pub off_case: usize,
    pub completed: usize,
    pub unscheduled: usize,
}

/// 看板引擎
#[derive(Clone)]
pub struct BoardEngine {
    date: NaiveDate,
    resolver: Arc<AssignmentResolver>,
    state_machine: Arc<ReadinessStateMachine>,
    board: Arc<Mutex<QueueCoordinator>>,
    repository: Arc<dyn CaseRepository>,
    confirmations: Arc<dyn ConfirmationChannel>,
    config: WorkflowConfig,
}

impl BoardEngine {
    /// 创建指定手术日的看板引擎
    pub fn new(
        date: NaiveDate,
        resolver: Arc<AssignmentResolver>,
        repository: Arc<dyn CaseRepository>,
        confirmations: Arc<dyn ConfirmationChannel>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            date,
            resolver: resolver.clone(),
            state_machine: Arc::new(ReadinessStateMachine::new()),
            board: Arc::new(Mutex::new(QueueCoordinator::new(date, resolver))),
            repository,
            confirmations,
            config,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// 从仓储加载当日病例并自动排房
    ///
    /// 无房间的病例按主刀医生对照排班解析；解析不到的进入
    /// 未排房队列等待人工拖放。
    pub async fn load_board(&self) -> Result<usize> {
        let cases = self.repository.load_by_date(self.date).await?;
        let mut board = self.board.lock().await;
        let mut loaded = 0;
        for mut case in cases {
            if case.room.is_none() {
                case.room = self
                    .resolver
                    .resolve(&case.surgeon, self.date, case.scheduled_time);
            }
            board.insert_case(case);
            loaded += 1;
        }
        tracing::info!("Loaded {} cases onto board for {}", loaded, self.date);
        Ok(loaded)
    }

    /// 接收新病例：解析排房、入队、落盘
    pub async fn admit_case(&self, mut case: SurgeryCase) -> Result<Uuid> {
        case.surgery_date = self.date;
        if case.room.is_none() {
            case.room = self
                .resolver
                .resolve(&case.surgeon, self.date, case.scheduled_time);
        }
        let kind = self.config.surgery_kind_of(case.scheduled_time);
        match &case.room {
            Some(room) => tracing::info!("Case {} ({:?}) assigned to {}", case.hn, kind, room),
            None if kind == SurgeryKind::Emergency => {
                tracing::info!("Emergency case {} queued unscheduled", case.hn)
            }
            None => tracing::info!("Case {} left unscheduled", case.hn),
        }

        let id = case.id;
        let mut board = self.board.lock().await;
        board.insert_case(case);
        self.persist_case(&board, id).await?;
        Ok(id)
    }

    /// 记录暂缓原因
    ///
    /// NPO 未满且给了恢复时刻时进入定时暂缓，否则为普通暂缓。
    pub async fn set_hold(
        &self,
        id: Uuid,
        reason: HoldReason,
        resume_at: Option<NaiveTime>,
        now: NaiveDateTime,
    ) -> Result<CaseState> {
        let event = match (reason, resume_at) {
            (HoldReason::NpoIncomplete, Some(at)) => {
                CaseEvent::HoldTimed(HoldReason::NpoIncomplete, at)
            }
            (reason, _) => CaseEvent::Hold(reason),
        };
        self.apply_and_persist(id, event, now).await
    }

    /// 手动恢复就绪
    pub async fn clear_hold(&self, id: Uuid, now: NaiveDateTime) -> Result<CaseState> {
        self.apply_and_persist(id, CaseEvent::MarkReady, now).await
    }

    /// 拒绝手术改为延期
    pub async fn reschedule_refusal(&self, id: Uuid, now: NaiveDateTime) -> Result<CaseState> {
        self.apply_and_persist(id, CaseEvent::Reschedule, now).await
    }

    /// OFF Case 最终取消：先过确认通道，确认后才终结
    pub async fn finalize_off_case(
        &self,
        id: Uuid,
        now: NaiveDateTime,
    ) -> Result<OffCaseOutcome> {
        let prompt = {
            let board = self.board.lock().await;
            let case = board
                .case(id)
                .ok_or_else(|| OrBoardError::NotFound(id.to_string()))?;
            // 前置条件提前检查，避免确认完才报错
            if !self
                .state_machine
                .can_transition(case.state, crate::state_machine::CaseEventKind::OffCase)
                || case.hold_reason != Some(HoldReason::Refusal)
            {
                return Err(OrBoardError::InvalidTransition {
                    from: case.state.to_string(),
                    event: "OffCase".to_string(),
                });
            }
            format!(
                "ยืนยัน OFF Case: {} (HN {})? การดำเนินการนี้ไม่สามารถย้อนกลับได้",
                case.patient_name, case.hn
            )
        };

        if !self.confirmations.confirm(&prompt).await {
            tracing::info!("OFF Case declined for case {}", id);
            return Ok(OffCaseOutcome::Declined);
        }

        self.apply_and_persist(id, CaseEvent::OffCase, now).await?;
        tracing::warn!("Case {} finalized as OFF Case", id);
        Ok(OffCaseOutcome::Applied)
    }

    /// 完成确认：术中记录必填字段齐全才允许
    pub async fn confirm_case(
        &self,
        id: Uuid,
        record: OperativeRecord,
        now: NaiveDateTime,
    ) -> Result<CaseState> {
        let missing = record.missing_fields();
        if !missing.is_empty() {
            return Err(OrBoardError::MissingFields(missing));
        }

        let mut board = self.board.lock().await;
        let state = board.apply_event(&self.state_machine, id, CaseEvent::Complete, now)?;
        board.attach_operative(id, record)?;
        self.persist_case(&board, id).await?;
        Ok(state)
    }

    /// 同房内上移/下移一格
    pub async fn move_within_room(&self, id: Uuid, direction: MoveDirection) -> Result<MoveOutcome> {
        let mut board = self.board.lock().await;
        let outcome = board.move_within_room(id, direction)?;
        self.persist_if_moved(&board, id, &outcome).await?;
        Ok(outcome)
    }

    /// 拖入目标房；跨房归属不符时走确认通道
    pub async fn drop_into_room(&self, id: Uuid, room: &str) -> Result<MoveOutcome> {
        let outcome = {
            let mut board = self.board.lock().await;
            let outcome = board.drop_into_room(id, room, false)?;
            self.persist_if_moved(&board, id, &outcome).await?;
            outcome
        };
        match outcome {
            MoveOutcome::NeedsConfirmation { room, owner } => {
                self.confirm_cross_room(id, &room, &owner, CrossRoomMove::Drop)
                    .await
            }
            other => Ok(other),
        }
    }

    /// 拖放到某病例之前；跨房归属不符时走确认通道
    pub async fn insert_before(&self, id: Uuid, target: Uuid) -> Result<MoveOutcome> {
        let outcome = {
            let mut board = self.board.lock().await;
            let outcome = board.insert_before(id, target, false)?;
            self.persist_if_moved(&board, id, &outcome).await?;
            outcome
        };
        match outcome {
            MoveOutcome::NeedsConfirmation { room, owner } => {
                self.confirm_cross_room(id, &room, &owner, CrossRoomMove::Before(target))
                    .await
            }
            other => Ok(other),
        }
    }

    /// 直接指定队列位置
    pub async fn set_queue_position(&self, id: Uuid, position: u32) -> Result<MoveOutcome> {
        let mut board = self.board.lock().await;
        let outcome = board.set_queue_position(id, position)?;
        self.persist_if_moved(&board, id, &outcome).await?;
        Ok(outcome)
    }

    async fn confirm_cross_room(
        &self,
        id: Uuid,
        room: &str,
        owner: &str,
        mv: CrossRoomMove,
    ) -> Result<MoveOutcome> {
        let prompt =
            format!("ยืนยันการย้ายข้ามห้อง? ห้อง {room} เป็นของ {owner} ตามตารางผ่าตัด");
        if !self.confirmations.confirm(&prompt).await {
            tracing::info!("Cross-room move to {} declined for case {}", room, id);
            return Ok(MoveOutcome::NeedsConfirmation {
                room: room.to_string(),
                owner: owner.to_string(),
            });
        }

        let mut board = self.board.lock().await;
        let outcome = match mv {
            CrossRoomMove::Drop => board.drop_into_room(id, room, true)?,
            CrossRoomMove::Before(target) => board.insert_before(id, target, true)?,
        };
        self.persist_if_moved(&board, id, &outcome).await?;
        Ok(outcome)
    }

    /// 扫描并恢复到点的定时暂缓（幂等）
    pub async fn run_due_transitions(&self, now: NaiveDateTime) -> Result<usize> {
        let mut board = self.board.lock().await;
        let due = board.due_timed_holds(now, self.config.overnight_unscheduled_holds);
        let mut resumed = 0;
        for id in due {
            match board.apply_event(&self.state_machine, id, CaseEvent::ResumeDue, now) {
                Ok(_) => {
                    self.persist_case(&board, id).await?;
                    tracing::info!("Timed hold expired, case {} back to ready", id);
                    resumed += 1;
                }
                // 扫描与手动操作竞争时病例可能已离开定时暂缓
                Err(e) => tracing::debug!("Skipping case {} during sweep: {}", id, e),
            }
        }
        Ok(resumed)
    }

    /// 看板概况统计
    pub async fn overview(&self) -> BoardOverview {
        let board = self.board.lock().await;
        let mut overview = BoardOverview::default();
        let mut states: HashMap<CaseState, usize> = HashMap::new();
        for case in board.cases() {
            *states.entry(case.state).or_default() += 1;
            overview.total += 1;
            if case.room.is_none() {
                overview.unscheduled += 1;
            }
        }
        overview.ready = states.get(&CaseState::Ready).copied().unwrap_or(0);
        overview.on_hold = states.get(&CaseState::OnHold).copied().unwrap_or(0);
        overview.timed_hold = states.get(&CaseState::TimedHold).copied().unwrap_or(0);
        overview.off_case = states.get(&CaseState::OffCase).copied().unwrap_or(0);
        overview.completed = states.get(&CaseState::Completed).copied().unwrap_or(0);
        overview
    }

    pub async fn case(&self, id: Uuid) -> Option<SurgeryCase> {
        self.board.lock().await.case(id).cloned()
    }

    /// 某条队列的病例快照，按队列顺序
    pub async fn room_queue(&self, room: Option<&str>) -> Vec<SurgeryCase> {
        self.board
            .lock()
            .await
            .cases_in(room)
            .into_iter()
            .cloned()
            .collect()
    }

    /// 构造定时暂缓监视任务
    pub fn hold_watcher(self: &Arc<Self>) -> HoldWatcher {
        HoldWatcher::new(self.clone(), self.config.tick_interval())
    }

    async fn apply_and_persist(
        &self,
        id: Uuid,
        event: CaseEvent,
        now: NaiveDateTime,
    ) -> Result<CaseState> {
        let mut board = self.board.lock().await;
        let state = board.apply_event(&self.state_machine, id, event, now)?;
        self.persist_case(&board, id).await?;
        Ok(state)
    }

    async fn persist_case(&self, board: &QueueCoordinator, id: Uuid) -> Result<()> {
        if let Some(case) = board.case(id) {
            self.repository.persist(case).await?;
        }
        Ok(())
    }

    async fn persist_if_moved(
        &self,
        board: &QueueCoordinator,
        id: Uuid,
        outcome: &MoveOutcome,
    ) -> Result<()> {
        if matches!(outcome, MoveOutcome::Moved(_)) {
            self.persist_case(board, id).await?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum CrossRoomMove {
    Drop,
    Before(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{AutoConfirm, AutoDeny, InMemoryCaseRepository};

    fn monday() -> NaiveDate {
        // 2025-09-01 星期一
        NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
    }

    fn now() -> NaiveDateTime {
        monday().and_hms_opt(8, 0, 0).unwrap()
    }

    fn engine_with(confirmations: Arc<dyn ConfirmationChannel>) -> BoardEngine {
        BoardEngine::new(
            monday(),
            Arc::new(AssignmentResolver::default()),
            Arc::new(InMemoryCaseRepository::new()),
            confirmations,
            WorkflowConfig::default(),
        )
    }

    fn case_for(surgeon: &str, n: u32) -> SurgeryCase {
        let mut c = SurgeryCase::new(format!("68-{n:05}"), format!("ผู้ป่วย {n}"), surgeon);
        c.surgery_date = monday();
        c
    }

    fn full_record() -> OperativeRecord {
        OperativeRecord {
            start_time: NaiveTime::from_hms_opt(9, 0, 0),
            end_time: NaiveTime::from_hms_opt(11, 30, 0),
            assist1: Some("นพ.ผู้ช่วย หนึ่ง".to_string()),
            assist2: None,
            scrub_nurse: Some("พยาบาล ส่งเครื่องมือ".to_string()),
            circulate_nurse: Some("พยาบาล หมุนเวียน".to_string()),
        }
    }

    #[tokio::test]
    async fn test_admit_auto_assigns_room() {
        let engine = engine_with(Arc::new(AutoConfirm));
        // 周一 ห้องผ่าตัด 2 归 นพ.ณัฐพงศ์
        let id = engine
            .admit_case(case_for("นพ.ณัฐพงศ์ ศรีโพนทอง", 1))
            .await
            .unwrap();
        let case = engine.case(id).await.unwrap();
        assert_eq!(case.room.as_deref(), Some("ห้องผ่าตัด 2"));
        assert_eq!(case.queue_position, Some(1));
    }

    #[tokio::test]
    async fn test_admit_unresolvable_goes_unscheduled() {
        let engine = engine_with(Arc::new(AutoConfirm));
        let id = engine
            .admit_case(case_for("นพ.ไม่มี ในระบบ", 1))
            .await
            .unwrap();
        let case = engine.case(id).await.unwrap();
        assert_eq!(case.room, None);
        assert_eq!(engine.overview().await.unscheduled, 1);
    }

    #[tokio::test]
    async fn test_cross_room_move_denied_leaves_case_in_place() {
        let engine = engine_with(Arc::new(AutoDeny));
        let id = engine
            .admit_case(case_for("นพ.สุริยา คุณาชน", 1))
            .await
            .unwrap();
        let source = engine.case(id).await.unwrap().room.clone();

        let outcome = engine.drop_into_room(id, "ห้องผ่าตัด 2").await.unwrap();
        assert!(matches!(outcome, MoveOutcome::NeedsConfirmation { .. }));
        assert_eq!(engine.case(id).await.unwrap().room, source);
    }

    #[tokio::test]
    async fn test_cross_room_move_confirmed_applies_once() {
        let engine = engine_with(Arc::new(AutoConfirm));
        let id = engine
            .admit_case(case_for("นพ.สุริยา คุณาชน", 1))
            .await
            .unwrap();

        let outcome = engine.drop_into_room(id, "ห้องผ่าตัด 2").await.unwrap();
        assert!(matches!(outcome, MoveOutcome::Moved(_)));
        let case = engine.case(id).await.unwrap();
        assert_eq!(case.room.as_deref(), Some("ห้องผ่าตัด 2"));

        let queue = engine.room_queue(Some("ห้องผ่าตัด 2")).await;
        assert_eq!(queue.iter().filter(|c| c.id == id).count(), 1);
    }

    #[tokio::test]
    async fn test_timed_hold_resume_is_idempotent() {
        let engine = engine_with(Arc::new(AutoConfirm));
        let id = engine
            .admit_case(case_for("นพ.ณัฐพงศ์ ศรีโพนทอง", 1))
            .await
            .unwrap();

        engine
            .set_hold(
                id,
                HoldReason::NpoIncomplete,
                NaiveTime::from_hms_opt(10, 30, 0),
                now(),
            )
            .await
            .unwrap();
        assert_eq!(engine.case(id).await.unwrap().state, CaseState::TimedHold);

        // 未到点不恢复
        let early = monday().and_hms_opt(10, 0, 0).unwrap();
        assert_eq!(engine.run_due_transitions(early).await.unwrap(), 0);

        // 到点恢复一次，再扫描为空
        let due = monday().and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(engine.run_due_transitions(due).await.unwrap(), 1);
        assert_eq!(engine.case(id).await.unwrap().state, CaseState::Ready);
        assert_eq!(engine.run_due_transitions(due).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_manual_clear_beats_watcher() {
        let engine = engine_with(Arc::new(AutoConfirm));
        let id = engine
            .admit_case(case_for("นพ.ณัฐพงศ์ ศรีโพนทอง", 1))
            .await
            .unwrap();

        engine
            .set_hold(
                id,
                HoldReason::NpoIncomplete,
                NaiveTime::from_hms_opt(10, 30, 0),
                now(),
            )
            .await
            .unwrap();
        engine.clear_hold(id, now()).await.unwrap();
        assert_eq!(engine.case(id).await.unwrap().state, CaseState::Ready);

        // 到点扫描不会二次触发
        let due = monday().and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(engine.run_due_transitions(due).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_confirm_requires_complete_record() {
        let engine = engine_with(Arc::new(AutoConfirm));
        let id = engine
            .admit_case(case_for("นพ.ณัฐพงศ์ ศรีโพนทอง", 1))
            .await
            .unwrap();

        let mut partial = full_record();
        partial.scrub_nurse = None;
        let err = engine.confirm_case(id, partial, now()).await.unwrap_err();
        assert!(matches!(err, OrBoardError::MissingFields(_)));
        assert_eq!(engine.case(id).await.unwrap().state, CaseState::Ready);

        let state = engine.confirm_case(id, full_record(), now()).await.unwrap();
        assert_eq!(state, CaseState::Completed);

        // 终态拒绝再次确认
        let err = engine
            .confirm_case(id, full_record(), now())
            .await
            .unwrap_err();
        assert!(matches!(err, OrBoardError::TerminalState(_)));
    }

    #[tokio::test]
    async fn test_off_case_two_step_confirmation() {
        let declining = engine_with(Arc::new(AutoDeny));
        let id = declining
            .admit_case(case_for("นพ.ณัฐพงศ์ ศรีโพนทอง", 1))
            .await
            .unwrap();
        declining
            .set_hold(id, HoldReason::Refusal, None, now())
            .await
            .unwrap();

        // 取消确认：病例留在暂缓
        let outcome = declining.finalize_off_case(id, now()).await.unwrap();
        assert_eq!(outcome, OffCaseOutcome::Declined);
        assert_eq!(declining.case(id).await.unwrap().state, CaseState::OnHold);

        let confirming = engine_with(Arc::new(AutoConfirm));
        let id = confirming
            .admit_case(case_for("นพ.ณัฐพงศ์ ศรีโพนทอง", 2))
            .await
            .unwrap();
        confirming
            .set_hold(id, HoldReason::Refusal, None, now())
            .await
            .unwrap();
        let outcome = confirming.finalize_off_case(id, now()).await.unwrap();
        assert_eq!(outcome, OffCaseOutcome::Applied);
        assert_eq!(confirming.case(id).await.unwrap().state, CaseState::OffCase);

        // 终态不可再移动
        let err = confirming
            .move_within_room(id, MoveDirection::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, OrBoardError::TerminalState(_)));
    }

    #[tokio::test]
    async fn test_off_case_requires_refusal_hold() {
        let engine = engine_with(Arc::new(AutoConfirm));
        let id = engine
            .admit_case(case_for("นพ.ณัฐพงศ์ ศรีโพนทอง", 1))
            .await
            .unwrap();
        engine
            .set_hold(id, HoldReason::LabNotReady, None, now())
            .await
            .unwrap();
        assert!(engine.finalize_off_case(id, now()).await.is_err());
    }

    #[tokio::test]
    async fn test_load_board_auto_assigns() {
        let repo = Arc::new(InMemoryCaseRepository::new());
        let mut seeded = Vec::new();
        for n in 1..=2 {
            seeded.push(case_for("นพ.ณัฐพงศ์ ศรีโพนทอง", n));
        }
        repo.seed(seeded).await;

        let engine = BoardEngine::new(
            monday(),
            Arc::new(AssignmentResolver::default()),
            repo,
            Arc::new(AutoConfirm),
            WorkflowConfig::default(),
        );
        assert_eq!(engine.load_board().await.unwrap(), 2);

        let queue = engine.room_queue(Some("ห้องผ่าตัด 2")).await;
        let positions: Vec<_> = queue.iter().map(|c| c.queue_position).collect();
        assert_eq!(positions, vec![Some(1), Some(2)]);
    }

    #[tokio::test]
    async fn test_queue_stays_contiguous_through_operations() {
        let engine = engine_with(Arc::new(AutoConfirm));
        let mut ids = Vec::new();
        for n in 1..=4 {
            ids.push(
                engine
                    .admit_case(case_for("นพ.ณัฐพงศ์ ศรีโพนทอง", n))
                    .await
                    .unwrap(),
            );
        }
        engine
            .move_within_room(ids[3], MoveDirection::Up)
            .await
            .unwrap();
        engine.set_queue_position(ids[0], 3).await.unwrap();
        engine
            .set_hold(ids[1], HoldReason::Refusal, None, now())
            .await
            .unwrap();
        engine.finalize_off_case(ids[1], now()).await.unwrap();

        let queue = engine.room_queue(Some("ห้องผ่าตัด 2")).await;
        let mut expected = 1u32;
        for case in &queue {
            if case.is_off_case() {
                assert_eq!(case.queue_position, None);
            } else {
                assert_eq!(case.queue_position, Some(expected));
                expected += 1;
            }
        }
        assert_eq!(expected, 4);
    }
}
