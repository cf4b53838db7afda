//! 手术看板演示程序
//!
//! 展示看板核心流程：排班解析自动排房、暂缓与 NPO 定时恢复、
//! 队列拖放与跨房确认、OFF Case 二次确认和完成确认

use chrono::{Local, NaiveTime};
use orboard_core::{HoldReason, OperativeRecord, SurgeryCase};
use orboard_schedule::AssignmentResolver;
use orboard_workflow::{
    AutoConfirm, BoardEngine, InMemoryCaseRepository, MoveDirection, MoveOutcome, WorkflowConfig,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    let resolver = Arc::new(AssignmentResolver::default());
    let repository = Arc::new(InMemoryCaseRepository::new());
    let today = Local::now().date_naive();
    let now = Local::now().naive_local();

    let engine = Arc::new(BoardEngine::new(
        today,
        resolver.clone(),
        repository,
        Arc::new(AutoConfirm),
        WorkflowConfig::default(),
    ));

    println!("🏥 手术看板演示 — {today}\n");

    // 1. 当日排班表
    println!("📅 当日排班:");
    for (room, info) in resolver.schedule_for_date(today) {
        println!("   {room}: {} ({})", info.doctor, info.period);
    }

    // 2. 接收病例，按排班自动排房
    let mut first = SurgeryCase::new("68-10001", "สมชาย ใจดี", "นพ.ณัฐพงศ์ ศรีโพนทอง");
    first.scheduled_time = NaiveTime::from_hms_opt(9, 0, 0);
    first.diagnosis = Some("Acute appendicitis".to_string());
    first.operation = Some("Appendectomy".to_string());
    let first = engine.admit_case(first).await?;

    let mut second = SurgeryCase::new("68-10002", "สมหญิง มั่นคง", "นพ.สุริยา คุณาชน");
    second.scheduled_time = NaiveTime::from_hms_opt(13, 0, 0);
    let second = engine.admit_case(second).await?;

    // 急诊，未指定时间，进入未排房队列
    let emergency = SurgeryCase::new("68-10003", "ฉุกเฉิน ด่วนมาก", "นพ.ไม่ทราบ ชื่อ");
    let emergency = engine.admit_case(emergency).await?;

    println!("\n✅ 接收 3 个病例");
    for id in [first, second, emergency] {
        let case = engine.case(id).await.expect("case admitted above");
        println!(
            "   {} {} -> {}",
            case.hn,
            case.patient_name,
            case.room.as_deref().unwrap_or("ยังไม่ระบุห้อง")
        );
    }

    // 3. NPO 定时暂缓与到点自动恢复
    let resume_at = (now + chrono::Duration::seconds(2)).time();
    engine
        .set_hold(first, HoldReason::NpoIncomplete, Some(resume_at), now)
        .await?;
    println!("\n⏳ 病例 68-10001 进入 NPO 定时暂缓，恢复时刻 {resume_at}");

    let watcher = engine.hold_watcher();
    let watcher_task = tokio::spawn(watcher.run());
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    let case = engine.case(first).await.expect("case exists");
    println!("   到点后状态: {}", case.state);
    watcher_task.abort();

    // 4. 跨房移动（归属不符会先过确认通道，这里自动确认）
    match engine.drop_into_room(emergency, "ห้องผ่าตัด 2").await? {
        MoveOutcome::Moved(_) => println!("\n🔀 急诊病例移入 ห้องผ่าตัด 2"),
        outcome => println!("\n🔀 移动结果: {outcome:?}"),
    }
    engine.move_within_room(emergency, MoveDirection::Up).await?;
    println!("   ห้องผ่าตัด 2 队列:");
    for case in engine.room_queue(Some("ห้องผ่าตัด 2")).await {
        println!(
            "   {}. {} ({})",
            case.queue_position.map_or("-".to_string(), |p| p.to_string()),
            case.patient_name,
            case.state
        );
    }

    // 5. 拒绝手术 -> OFF Case 二次确认
    engine
        .set_hold(second, HoldReason::Refusal, None, now)
        .await?;
    let outcome = engine.finalize_off_case(second, now).await?;
    println!("\n🚫 病例 68-10002 OFF Case: {outcome:?}");

    // 6. 完成确认（术中记录必填字段齐全）
    let record = OperativeRecord {
        start_time: NaiveTime::from_hms_opt(9, 5, 0),
        end_time: NaiveTime::from_hms_opt(10, 40, 0),
        assist1: Some("นพ.ผู้ช่วย หนึ่ง".to_string()),
        assist2: None,
        scrub_nurse: Some("พว.ส่งเครื่องมือ".to_string()),
        circulate_nurse: Some("พว.หมุนเวียน".to_string()),
    };
    let state = engine.confirm_case(first, record, now).await?;
    println!("✅ 病例 68-10001 完成确认: {state}");
    if let Some(case) = engine.case(first).await {
        println!("   JSON 快照: {}", serde_json::to_string(&case)?);
    }

    // 7. 看板概况
    let overview = engine.overview().await;
    println!("\n📊 看板概况:");
    println!("   病例总数: {}", overview.total);
    println!("   就绪: {}", overview.ready);
    println!("   暂缓: {}", overview.on_hold + overview.timed_hold);
    println!("   OFF Case: {}", overview.off_case);
    println!("   已完成: {}", overview.completed);
    println!("   未排房: {}", overview.unscheduled);

    Ok(())
}
