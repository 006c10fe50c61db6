use std::ops::Index;

use itertools::Itertools;
use varisat::{Lit, Var};

fn invert(lit: Lit) -> Lit {
    match lit.is_negative() {
        true => lit.var().positive(),
        false => lit.var().negative(),
    }
}

/// At least one var is true; A + B + C + ...
pub(crate) fn at_least_one(vars: Vec<Lit>) -> Vec<Vec<Lit>> {
    vec![vars]
}

/// At most `k` of `vars` are true.
///
/// `fresh` hands out unused variables for the counter registers.
pub(crate) fn at_most(vars: &[Lit], k: usize, mut fresh: impl FnMut() -> Var) -> Vec<Vec<Lit>> {
    let n = vars.len();
    if k >= n {
        return Vec::new();
    }
    if k == 0 {
        return vars.iter().map(|var| vec![invert(*var)]).collect();
    }
    if k == 1 {
        // no two are true; (!A + !B) * (!A + !C) * ...
        return vars.iter()
            .combinations(2)
            .map(|pair| vec![invert(**pair.index(0)), invert(**pair.index(1))])
            .collect();
    }

    // sequential counter: register (i, j) holds when at least j + 1 of the first i + 1 vars are true
    let registers = (0..n - 1).map(|_| (0..k).map(|_| fresh().positive()).collect_vec()).collect_vec();
    let mut clauses = Vec::with_capacity(2 * n * k + n);

    clauses.push(vec![invert(vars[0]), registers[0][0]]);
    clauses.extend((1..k).map(|j| vec![invert(registers[0][j])]));

    for i in 1..n - 1 {
        clauses.push(vec![invert(vars[i]), registers[i][0]]);
        clauses.push(vec![invert(registers[i - 1][0]), registers[i][0]]);
        for j in 1..k {
            clauses.push(vec![invert(vars[i]), invert(registers[i - 1][j - 1]), registers[i][j]]);
            clauses.push(vec![invert(registers[i - 1][j]), registers[i][j]]);
        }
        // a var may not push the count past k
        clauses.push(vec![invert(vars[i]), invert(registers[i - 1][k - 1])]);
    }
    clauses.push(vec![invert(vars[n - 1]), invert(registers[n - 2][k - 1])]);

    clauses
}

/// Not every one of `chosen` is true again; rules out a model already seen.
pub(crate) fn block(chosen: &[Lit]) -> Vec<Vec<Lit>> {
    vec![chosen.iter().map(|lit| invert(*lit)).collect()]
}
