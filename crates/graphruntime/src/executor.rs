use crate::condition::evaluate_condition;
use crate::engine::GraphEngine;
use chrono::Utc;
use graphcore::{
    GraphDefinition, LogBroadcaster, RunId, RunRecord, RunStatus, StateContainer, StepError,
    StepTiming, ToolError,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Drive one run from RUNNING to a terminal status. Any step failure is
/// contained here: it becomes a FAILED record with an `ERR:` log line
/// and never propagates to the caller or the scheduler.
pub(crate) async fn drive(
    engine: &GraphEngine,
    graph: Arc<GraphDefinition>,
    record: Arc<RwLock<RunRecord>>,
) {
    let run_id = {
        let mut rec = record.write().await;
        rec.status = RunStatus::Running;
        rec.updated_at = Some(Utc::now());
        rec.run_id
    };
    engine.persist_record(&record).await;
    tracing::info!(%run_id, graph_id = %graph.graph_id.unwrap_or_default(), "run started");

    match step_loop(engine, &graph, &record, run_id).await {
        Ok(()) => {
            let mut rec = record.write().await;
            rec.status = RunStatus::Success;
            push_line(&mut rec, engine.broadcaster(), run_id, "RUN_COMPLETE".to_string());
            rec.current_node = None;
            tracing::info!(%run_id, "run completed");
        }
        Err(e) => {
            let mut rec = record.write().await;
            rec.status = RunStatus::Failed;
            push_line(&mut rec, engine.broadcaster(), run_id, format!("ERR:{e}"));
            tracing::error!(%run_id, "run failed: {e}");
        }
    }
    engine.persist_record(&record).await;
}

/// The sequential dispatch loop: strictly one step in flight per run.
async fn step_loop(
    engine: &GraphEngine,
    graph: &GraphDefinition,
    record: &Arc<RwLock<RunRecord>>,
    run_id: RunId,
) -> Result<(), StepError> {
    let mut current = graph.resolved_start().map(str::to_string);
    let mut visits: u32 = 0;

    while let Some(node_name) = current {
        {
            let mut rec = record.write().await;
            rec.current_node = Some(node_name.clone());
            push_line(
                &mut rec,
                engine.broadcaster(),
                run_id,
                format!("START_NODE:{node_name}"),
            );
        }

        let node = graph
            .node(&node_name)
            .ok_or_else(|| StepError::UnknownNode(node_name.clone()))?;
        let tool = engine
            .tools()
            .get(&node.func)
            .ok_or_else(|| StepError::ToolNotFound {
                node: node_name.clone(),
                func: node.func.clone(),
            })?;

        // The tool sees a point-in-time view of the state; the write
        // lock is never held across the invocation, so lookups and the
        // log stream stay responsive during a long step. The invocation
        // runs in its own task so a panicking tool surfaces as a join
        // error and fails the run instead of unwinding into the caller
        // or killing the background task.
        let state_view = record.read().await.state.data.clone();
        let meta = node.meta.clone();
        let started = Instant::now();
        let invocation = tokio::spawn(async move { tool.invoke(&state_view, &meta).await });
        let result = invocation
            .await
            .map_err(|e| ToolError::Join(e.to_string()))??;
        let elapsed = started.elapsed().as_secs_f64();

        let next = {
            let mut rec = record.write().await;
            rec.metrics
                .entry(node_name.clone())
                .or_default()
                .push(StepTiming { time_s: elapsed });
            if let Some(patch) = result {
                rec.state.merge(patch);
            }
            let line = format!(
                "END_NODE:{node_name} elapsed={elapsed:.4} state_snapshot={}",
                rec.state.snapshot_repr()
            );
            push_line(&mut rec, engine.broadcaster(), run_id, line);
            next_node(graph, &node_name, &rec.state)
        };

        visits += 1;
        if visits >= graph.max_visits {
            return Err(StepError::MaxVisitsExceeded);
        }
        current = next;
    }

    Ok(())
}

/// First edge option whose condition is absent or holds wins; a winning
/// option without a `next` target, or no winner at all, ends the run.
fn next_node(graph: &GraphDefinition, current: &str, state: &StateContainer) -> Option<String> {
    let options = graph.edges.get(current)?;
    for option in options {
        let selected = match &option.cond {
            None => true,
            Some(cond) => evaluate_condition(state, cond),
        };
        if selected {
            return option.next.clone();
        }
    }
    None
}

/// Append a log line, publish it to live subscribers, and touch
/// `updated_at` — the ordering guarantee for a run's log stream lives
/// here: one writer, one line at a time.
fn push_line(record: &mut RunRecord, broadcaster: &LogBroadcaster, run_id: RunId, line: String) {
    broadcaster.publish(run_id, &line);
    record.logs.push(line);
    record.updated_at = Some(Utc::now());
}
