use std::io;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use uwu::VM;

pub fn fib(c: &mut Criterion) {
    let src = r#"
fwun fib(n) [:
  ?w? n < 2 [: out n >> :]
  out fib(n - 2) + fib(n - 1) >>
:]
fib(20)
"#;
    c.bench_function("fib_20", |b| {
        let mut vm = VM::new(io::empty(), io::sink());
        b.iter(|| vm.interpret(black_box(src)));
    });
}

pub fn equality(c: &mut Criterion) {
    let src = r#"
uwu i := 0
untiw i = 10000 [:
  i := i + 1

  1 = 1 1 = 2 1 = twue 1 = "str" 1 = `c`
  twue = twue twue = fawse twue = 1 twue = "str"
  "str" = "str" "str" = "stru" "str" = 1 "str" = `s`
  `a` = `a` `a` = `b` ~n = ~n ~n != ~t
:]
"#;
    c.bench_function("equality", |b| {
        let mut vm = VM::new(io::empty(), io::sink());
        b.iter(|| vm.interpret(black_box(src)));
    });
}

pub fn locals(c: &mut Criterion) {
    let src = r#"
[:
  uwu sum := 0
  uwu i := 0
  untiw i >= 10000 [:
    uwu a := i * 2
    uwu b := a - i / 2
    sum := sum + a - b
    i := i + 1
  :]
:]
"#;
    c.bench_function("locals", |b| {
        let mut vm = VM::new(io::empty(), io::sink());
        b.iter(|| vm.interpret(black_box(src)));
    });
}

pub fn concatenation(c: &mut Criterion) {
    let src = r#"
uwu i := 0
untiw i = 1000 [:
  uwu s := "uwu" + `-` + "owo"
  ?w? s != "uwu-owo" [: ouo "mismatch" >> :]
  i := i + 1
:]
"#;
    c.bench_function("concatenation", |b| {
        let mut vm = VM::new(io::empty(), io::sink());
        b.iter(|| vm.interpret(black_box(src)));
    });
}

pub fn natives(c: &mut Criterion) {
    let src = r#"
uwu i := 0
uwu acc := 0
untiw i = 5000 [:
  acc := acc + floor(sqrt(abs(-i))) + pow(2, 3)
  i := i + 1
:]
"#;
    c.bench_function("natives", |b| {
        let mut vm = VM::new(io::empty(), io::sink());
        b.iter(|| vm.interpret(black_box(src)));
    });
}

criterion_group!(basics, fib, equality, locals, concatenation, natives);
criterion_main!(basics);
