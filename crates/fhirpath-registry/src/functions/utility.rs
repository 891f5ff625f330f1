//! `iif`, `trace`, `now`, `today`, `timeOfDay` — spec.md §4.6's utility
//! group. `iif` and `trace`'s non-criterion/non-name arguments are
//! deferred through the same `loop_arg_index`/`LoopEvaluator` channel
//! `where`/`select` use (spec.md §1 groups `iif` with the looping
//! functions explicitly): `iif` asks for branch 0 or 1 by index instead of
//! iterating `$this`, and `trace`'s selector is evaluated once per input
//! item purely for its logged side effect.

use std::sync::Arc;

use chrono::{Datelike, Local, Timelike};
use fhirpath_model::{
    Collection, DatePrecision, FhirPathValue, ModelAdapter, PartialDate, PartialDateTime,
    PartialTime, TimePrecision,
};

use crate::error::FunctionError;
use crate::function::{as_singleton, criterion_truth, Function, LoopEvaluator};
use crate::registry::FunctionRegistry;
use crate::spec::FunctionSpec;

/// `iif(criterion, trueResult [, otherwiseResult])`: `criterion` is
/// pre-evaluated into `args[0]`; the chosen branch alone is driven through
/// `looper` so the other is never evaluated.
pub struct IifFn;
impl Function for IifFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec =
            FunctionSpec::range("iif", 2, 3).with_loop_arg(1).with_loop_arg_alt(2);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let looper = looper.expect("iif's branches are always loop arguments");
        let is_true = criterion_truth("iif", args[0].clone())?;
        let context = as_singleton(&FhirPathValue::Collection(input.clone()))
            .unwrap_or(FhirPathValue::Collection(Collection::empty()));
        if is_true {
            looper.eval_once(&context, 0)
        } else if args.len() == 3 {
            looper.eval_once(&context, 1)
        } else {
            Ok(FhirPathValue::Collection(Collection::empty()))
        }
    }
}

/// `trace(name [, selector])`: logs and returns `input` unchanged. The
/// optional selector is evaluated once per item purely for what it logs.
pub struct TraceFn;
impl Function for TraceFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::range("trace", 1, 2).with_loop_arg(1);
        &SPEC
    }
    fn execute(
        &self,
        input: &Collection,
        args: &[FhirPathValue],
        looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let name = match as_singleton(&args[0]) {
            Some(FhirPathValue::String(s)) => s.to_string(),
            _ => {
                return Err(FunctionError::wrong_type(
                    "trace",
                    "name argument must be a String",
                ))
            }
        };
        if let Some(looper) = looper {
            for (index, item) in input.iter().enumerate() {
                let projected = looper.eval_once(item, index)?;
                log::debug!(target: "fhirpath::trace", "{name}[{index}]: {:?}", projected);
            }
        } else {
            for (index, item) in input.iter().enumerate() {
                log::debug!(target: "fhirpath::trace", "{name}[{index}]: {:?}", item);
            }
        }
        Ok(FhirPathValue::Collection(input.clone()))
    }
}

fn local_tz_offset_minutes() -> i32 {
    Local::now().offset().local_minus_utc() / 60
}

pub struct NowFn;
impl Function for NowFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("now", 0);
        &SPEC
    }
    fn execute(
        &self,
        _input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let now = Local::now();
        let date = now.date_naive();
        let tz = local_tz_offset_minutes();
        Ok(FhirPathValue::DateTime(PartialDateTime {
            date: PartialDate::new(date_year(date), date_month(date), date_day(date), DatePrecision::Day),
            time: Some(PartialTime::new(
                now.hour(),
                now.minute(),
                now.second(),
                now.nanosecond() / 1_000_000,
                TimePrecision::Millisecond,
                Some(tz),
            )),
        }))
    }
}

pub struct TodayFn;
impl Function for TodayFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("today", 0);
        &SPEC
    }
    fn execute(
        &self,
        _input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let date = Local::now().date_naive();
        Ok(FhirPathValue::Date(PartialDate::new(
            date_year(date),
            date_month(date),
            date_day(date),
            DatePrecision::Day,
        )))
    }
}

pub struct TimeOfDayFn;
impl Function for TimeOfDayFn {
    fn spec(&self) -> &FunctionSpec {
        const SPEC: FunctionSpec = FunctionSpec::exact("timeOfDay", 0);
        &SPEC
    }
    fn execute(
        &self,
        _input: &Collection,
        _args: &[FhirPathValue],
        _looper: Option<&mut dyn LoopEvaluator>,
        _model: Option<&dyn ModelAdapter>,
    ) -> Result<FhirPathValue, FunctionError> {
        let now = Local::now();
        Ok(FhirPathValue::Time(PartialTime::new(
            now.hour(),
            now.minute(),
            now.second(),
            now.nanosecond() / 1_000_000,
            TimePrecision::Millisecond,
            Some(local_tz_offset_minutes()),
        )))
    }
}

fn date_year(date: chrono::NaiveDate) -> i32 {
    date.year()
}
fn date_month(date: chrono::NaiveDate) -> u32 {
    date.month()
}
fn date_day(date: chrono::NaiveDate) -> u32 {
    date.day()
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Arc::new(IifFn));
    registry.register(Arc::new(TraceFn));
    registry.register(Arc::new(NowFn));
    registry.register(Arc::new(TodayFn));
    registry.register(Arc::new(TimeOfDayFn));
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BranchLooper {
        true_branch: FhirPathValue,
        false_branch: FhirPathValue,
    }
    impl LoopEvaluator for BranchLooper {
        fn eval_once(&mut self, _this: &FhirPathValue, index: usize) -> Result<FhirPathValue, FunctionError> {
            Ok(if index == 0 {
                self.true_branch.clone()
            } else {
                self.false_branch.clone()
            })
        }
        fn total(&self) -> usize {
            1
        }
    }

    #[test]
    fn iif_picks_true_branch_without_touching_false_branch() {
        let input = Collection::single(FhirPathValue::Integer(1));
        let args = vec![
            FhirPathValue::Boolean(true),
            FhirPathValue::Collection(Collection::empty()),
            FhirPathValue::Collection(Collection::empty()),
        ];
        let mut looper = BranchLooper {
            true_branch: FhirPathValue::String("yes".into()),
            false_branch: FhirPathValue::String("no".into()),
        };
        let result = IifFn.execute(&input, &args, Some(&mut looper), None).unwrap();
        assert_eq!(result, FhirPathValue::String("yes".into()));
    }

    #[test]
    fn iif_with_empty_criterion_and_no_otherwise_is_empty() {
        let input = Collection::single(FhirPathValue::Integer(1));
        let args = vec![
            FhirPathValue::Collection(Collection::empty()),
            FhirPathValue::Collection(Collection::empty()),
        ];
        let mut looper = BranchLooper {
            true_branch: FhirPathValue::String("yes".into()),
            false_branch: FhirPathValue::String("no".into()),
        };
        let result = IifFn.execute(&input, &args, Some(&mut looper), None).unwrap();
        assert_eq!(result, FhirPathValue::Collection(Collection::empty()));
    }

    #[test]
    fn trace_returns_input_unchanged() {
        let input = Collection::single(FhirPathValue::Integer(42));
        let args = vec![FhirPathValue::String("label".into())];
        let result = TraceFn.execute(&input, &args, None, None).unwrap();
        assert_eq!(result, FhirPathValue::Collection(input));
    }

    #[test]
    fn today_has_day_precision() {
        let result = TodayFn.execute(&Collection::empty(), &[], None, None).unwrap();
        match result {
            FhirPathValue::Date(_) => {}
            other => panic!("expected Date, got {other:?}"),
        }
    }
}
