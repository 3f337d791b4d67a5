//! # Batch Module
//!
//! Runs one program against many independent inputs at once. Every run
//! gets its own machine and its own copy of the program, so the runs are
//! spread over rayon's thread pool with nothing shared between them.
use super::{Error, Interpreter, Program, TestingDevice};
use rayon::prelude::*;

/// Run `program` once per input, in parallel. The results come back in
/// the same order as the inputs.
pub fn run_batch(program: &Program, inputs: &[Vec<i64>]) -> Vec<Result<Vec<i64>, Error>> {
    inputs
        .par_iter()
        .map(|input| {
            Interpreter::new(program, TestingDevice::new_raw(input.clone()))
                .finish()
                .map(|device| device.output_vals())
        })
        .collect()
}

/// Like [`run_batch`], but for programs that answer with a single value.
/// Runs that print nothing are reported as exhausted input.
pub fn first_outputs(program: &Program, inputs: &[Vec<i64>]) -> Vec<Result<i64, Error>> {
    inputs
        .par_iter()
        .map(|input| {
            let mut machine = Interpreter::new(program, TestingDevice::new_raw(input.clone()));
            machine.run_until_output()?.ok_or(Error::InputExhausted)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_keeps_order() {
        // Prints 1 if the input equals 8, and 0 otherwise.
        let program = Program::new(vec![3, 9, 8, 9, 10, 9, 4, 9, 99, -1, 8]);
        let inputs: Vec<Vec<i64>> = (0..64).map(|n| vec![n]).collect();
        let results = run_batch(&program, &inputs);
        assert_eq!(results.len(), 64);
        for (n, result) in results.into_iter().enumerate() {
            assert_eq!(result, Ok(vec![i64::from(n == 8)]));
        }
    }

    #[test]
    fn test_batch_reports_each_failure() {
        let program = Program::new(vec![3, 0, 4, 0, 99]);
        let results = run_batch(&program, &[vec![5], vec![]]);
        assert_eq!(results, vec![Ok(vec![5]), Err(Error::InputExhausted)]);
    }

    #[test]
    fn test_first_outputs() {
        let program = Program::new(vec![3, 0, 4, 0, 4, 0, 99]);
        let results = first_outputs(&program, &[vec![3], vec![-2]]);
        assert_eq!(results, vec![Ok(3), Ok(-2)]);
    }
}
