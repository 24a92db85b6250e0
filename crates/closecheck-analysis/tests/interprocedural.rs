// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Helpers that acquire, release or receive the resource, and the
//! termination of recursive call graphs.

mod common;

use closecheck_analysis::{
    analyze, AnalyzerOptions, Analyzer, CollectingSink, ConfigError, StepKind, TargetConfig, Verdict,
};
use closecheck_ir::{FuncId, ProgramBuilder};
use common::{finding_lines, run, Std};

/// `func getResp() *http.Response { resp, err := http.Get(..); return resp }`
fn get_resp(p: &mut ProgramBuilder, std: &Std, line: u32) -> FuncId {
    let f = std.func_sig(p, "getResp", &[], &[std.resp_ptr]);
    let mut b = p.body(f);
    b.at(line, 2);
    let (_, resp) = std.get(&mut b);
    b.ret(&[resp]);
    f
}

/// Like `get_resp`, but defers `resp.Body.Close()` before returning.
fn get_closed_resp(p: &mut ProgramBuilder, std: &Std) -> FuncId {
    let f = std.func_sig(p, "getClosedResp", &[], &[std.resp_ptr]);
    let mut b = p.body(f);
    let (_, resp) = std.get(&mut b);
    let body = std.body(&mut b, resp);
    std.defer_close_body(&mut b, body);
    b.ret(&[resp]);
    f
}

/// `func closeResp(resp *http.Response) { defer resp.Body.Close() }`
fn close_resp(p: &mut ProgramBuilder, std: &Std) -> FuncId {
    let f = std.func_sig(p, "closeResp", &[std.resp_ptr], &[]);
    let mut b = p.body(f);
    let resp = b.param("resp", std.resp_ptr);
    let body = std.body(&mut b, resp);
    std.defer_close_body(&mut b, body);
    b.ret(&[]);
    f
}

/// `func closeBody(b io.Closer) { defer b.Close() }`
fn close_body(p: &mut ProgramBuilder, std: &Std) -> FuncId {
    let f = std.func_sig(p, "closeBody", &[std.closer], &[]);
    let mut b = p.body(f);
    let closer = b.param("b", std.closer);
    std.defer_close_body(&mut b, closer);
    b.ret(&[]);
    f
}

#[test]
fn helper_returning_resource_is_checked_at_callers() {
    let (mut p, std) = Std::new();
    let helper = get_resp(&mut p, &std, 23);
    let caller = std.func(&mut p, "func_test2");
    {
        let mut b = p.body(caller);
        let resp = b.at(18, 2).call_static(helper, &[]);
        let body = std.body(&mut b, resp);
        std.defer_close_body(&mut b, body);
        b.ret(&[]);
    }
    let report = run(&p.finish());
    assert!(report.is_clean(), "{:?}", report.findings);
    assert_eq!(report.sites_checked, 2);
    assert_eq!(report.sites_skipped, 0);
}

#[test]
fn caller_dropping_returned_resource_is_flagged() {
    let (mut p, std) = Std::new();
    let helper = get_resp(&mut p, &std, 23);
    let caller = std.func(&mut p, "drops");
    {
        let mut b = p.body(caller);
        b.at(40, 2).call_static(helper, &[]);
        b.ret(&[]);
    }
    // Only the caller: the helper hands its response back.
    assert_eq!(finding_lines(&run(&p.finish())), vec![40]);
}

#[test]
fn helper_returning_the_body_transfers_it() {
    let (mut p, std) = Std::new();
    let get_body = std.func_sig(&mut p, "getBody", &[], &[std.read_closer]);
    {
        let mut b = p.body(get_body);
        let (_, resp) = std.get(&mut b);
        let body = std.body(&mut b, resp);
        b.ret(&[body]);
    }
    let caller = std.func(&mut p, "func_test5");
    {
        let mut b = p.body(caller);
        let body = b.call_static(get_body, &[]);
        std.defer_close_body(&mut b, body);
        b.ret(&[]);
    }
    let report = run(&p.finish());
    assert!(report.is_clean());
    assert_eq!(report.sites_checked, 1);
}

#[test]
fn callee_that_releases_makes_callers_safe() {
    let (mut p, std) = Std::new();
    let helper = get_closed_resp(&mut p, &std);
    let caller = std.func(&mut p, "func_test6");
    {
        let mut b = p.body(caller);
        b.call_static(helper, &[]);
        b.ret(&[]);
    }
    let report = run(&p.finish());
    assert!(report.is_clean());
    assert_eq!(report.sites_skipped, 1);
}

#[test]
fn conditional_release_in_callee_is_trusted() {
    // Known gap: the callee check only asks whether a release is reachable.
    let (mut p, std) = Std::new();
    let helper = std.func_sig(&mut p, "maybeClosed", &[], &[std.resp_ptr]);
    {
        let mut b = p.body(helper);
        let (_, resp) = std.get(&mut b);
        let cond = b.constant(std.bool_, "debug");
        let then_block = b.new_block();
        let done = b.new_block();
        b.branch(cond, then_block, done);
        b.switch_to(then_block);
        let body = std.body(&mut b, resp);
        std.defer_close_body(&mut b, body);
        b.jump(done);
        b.switch_to(done);
        b.ret(&[resp]);
    }
    let caller = std.func(&mut p, "trusts");
    {
        let mut b = p.body(caller);
        b.call_static(helper, &[]);
        b.ret(&[]);
    }
    assert!(run(&p.finish()).is_clean());
}

#[test]
fn forwarded_to_closing_function() {
    let (mut p, std) = Std::new();
    let close = close_resp(&mut p, &std);
    let f = std.func(&mut p, "func_test7");
    {
        let mut b = p.body(f);
        let (_, resp) = std.get(&mut b);
        b.call_static(std.cookies, &[resp]);
        b.call_static(close, &[resp]);
        b.ret(&[]);
    }
    assert!(run(&p.finish()).is_clean());
}

#[test]
fn read_then_close_through_helper() {
    let (mut p, std) = Std::new();
    let close = close_body(&mut p, &std);
    let direct = std.func(&mut p, "func_test8");
    let deferred = std.func(&mut p, "func_test9");
    for (func, defer) in [(direct, false), (deferred, true)] {
        let mut b = p.body(func);
        let (_, resp) = std.get(&mut b);
        std.read_body(&mut b, resp);
        let body = std.body(&mut b, resp);
        let closer = b.upcast(body, std.closer);
        if defer {
            b.defer_static(close, &[closer]);
        } else {
            b.call_static(close, &[closer]);
        }
        b.ret(&[]);
    }
    let report = run(&p.finish());
    assert!(report.is_clean(), "{:?}", report.findings);
    assert_eq!(report.sites_checked, 2);
}

#[test]
fn forwarding_helper_that_does_not_close_leaks() {
    let (mut p, std) = Std::new();
    let inspect = std.func_sig(&mut p, "inspect", &[std.resp_ptr], &[]);
    {
        let mut b = p.body(inspect);
        let resp = b.param("resp", std.resp_ptr);
        std.read_body(&mut b, resp);
        b.ret(&[]);
    }
    let f = std.func(&mut p, "passes");
    {
        let mut b = p.body(f);
        b.at(8, 2);
        let (_, resp) = std.get(&mut b);
        b.call_static(inspect, &[resp]);
        b.ret(&[]);
    }
    assert_eq!(finding_lines(&run(&p.finish())), vec![8]);
}

#[test]
fn every_field_of_a_returned_response_must_reach_the_release() {
    // resp := getResp(); _ = resp.StatusCode; defer resp.Body.Close()
    let (mut p, std) = Std::new();
    let helper = get_resp(&mut p, &std, 23);
    let caller = std.func(&mut p, "checksStatus");
    {
        let mut b = p.body(caller);
        let resp = b.at(30, 2).call_static(helper, &[]);
        let status = b.at(31, 5).field_addr_named(resp, "StatusCode");
        b.deref(status);
        let body = std.body(&mut b, resp);
        std.defer_close_body(&mut b, body);
        b.ret(&[]);
    }
    assert_eq!(finding_lines(&run(&p.finish())), vec![30]);
}

#[test]
fn returned_response_handed_to_a_closer_may_be_read_first() {
    let (mut p, std) = Std::new();
    let helper = get_resp(&mut p, &std, 23);
    let close = close_resp(&mut p, &std);
    let caller = std.func(&mut p, "readsThenCloses");
    {
        let mut b = p.body(caller);
        let resp = b.at(30, 2).call_static(helper, &[]);
        let status = b.field_addr_named(resp, "StatusCode");
        b.deref(status);
        b.call_static(std.cookies, &[resp]);
        b.call_static(close, &[resp]);
        b.ret(&[]);
    }
    let report = run(&p.finish());
    assert!(report.is_clean(), "{:?}", report.findings);
}

#[test]
fn method_call_on_returned_response_does_not_hide_the_release() {
    let (mut p, std) = Std::new();
    let helper = get_resp(&mut p, &std, 23);
    let caller = std.func(&mut p, "readsCookies");
    {
        let mut b = p.body(caller);
        let resp = b.at(30, 2).call_static(helper, &[]);
        b.call_static(std.cookies, &[resp]);
        let body = std.body(&mut b, resp);
        std.defer_close_body(&mut b, body);
        b.ret(&[]);
    }
    let report = run(&p.finish());
    assert!(report.is_clean(), "{:?}", report.findings);
    assert_eq!(report.sites_checked, 2);
}

#[test]
fn value_is_followed_into_the_matching_parameter_only() {
    let (mut p, std) = Std::new();
    let two = std.func_sig(&mut p, "closeSecond", &[std.resp_ptr, std.resp_ptr], &[]);
    {
        let mut b = p.body(two);
        let _first = b.param("a", std.resp_ptr);
        let second = b.param("b", std.resp_ptr);
        let body = std.body(&mut b, second);
        std.defer_close_body(&mut b, body);
        b.ret(&[]);
    }
    let f = std.func(&mut p, "order");
    {
        let mut b = p.body(f);
        b.at(3, 2);
        let (_, closed) = std.get(&mut b);
        b.at(4, 2);
        let (_, leaked) = std.get(&mut b);
        b.call_static(two, &[leaked, closed]);
        b.ret(&[]);
    }
    assert_eq!(finding_lines(&run(&p.finish())), vec![4]);
}

/// `type foo struct{}` with a pointer receiver method returning `*http.Response`.
fn foo_type(p: &mut ProgramBuilder) -> (closecheck_ir::TypeId, closecheck_ir::TypeId) {
    let foo = p.named("a", "foo");
    let empty = p.struct_type(&[]);
    p.set_underlying(foo, empty);
    let foo_ptr = p.pointer(foo);
    (foo, foo_ptr)
}

#[test]
fn method_returning_response_is_checked_at_callers() {
    let (mut p, std) = Std::new();
    let (foo, foo_ptr) = foo_type(&mut p);
    let sig = p.signature(Some(foo_ptr), &[], &[std.resp_ptr]);
    let get = p.declare("a", "(*foo).getResp", sig, std.file);
    p.add_method(foo, "getResp", sig, Some(get));
    {
        let mut b = p.body(get);
        let _recv = b.param("f", foo_ptr);
        b.at(20, 2);
        let (_, resp) = std.get(&mut b);
        b.ret(&[resp]);
    }
    let caller = std.func_sig(&mut p, "struct_test10", &[foo_ptr], &[]);
    {
        let mut b = p.body(caller);
        let recv = b.param("f", foo_ptr);
        let resp = b.at(28, 2).call_static(get, &[recv]);
        let body = std.body(&mut b, resp);
        std.defer_close_body(&mut b, body);
        b.ret(&[]);
    }
    assert!(run(&p.finish()).is_clean());
}

#[test]
fn bound_method_is_not_a_forwarding_target() {
    let (mut p, std) = Std::new();
    let (foo, foo_ptr) = foo_type(&mut p);
    let sig = p.signature(Some(foo_ptr), &[std.resp_ptr], &[]);
    let close = p.declare("a", "(*foo).closeResp", sig, std.file);
    p.add_method(foo, "closeResp", sig, Some(close));
    {
        let mut b = p.body(close);
        let _recv = b.param("f", foo_ptr);
        let resp = b.param("resp", std.resp_ptr);
        let body = std.body(&mut b, resp);
        std.defer_close_body(&mut b, body);
        b.ret(&[]);
    }
    let caller = std.func_sig(&mut p, "via_method", &[foo_ptr], &[]);
    {
        let mut b = p.body(caller);
        let recv = b.param("f", foo_ptr);
        b.at(14, 2);
        let (_, resp) = std.get(&mut b);
        b.call_static(close, &[recv, resp]);
        b.ret(&[]);
    }
    assert_eq!(finding_lines(&run(&p.finish())), vec![14]);
}

#[test]
fn self_recursive_forwarding_terminates() {
    let (mut p, std) = Std::new();
    let drain = std.func_sig(&mut p, "drain", &[std.resp_ptr], &[]);
    {
        let mut b = p.body(drain);
        let resp = b.param("resp", std.resp_ptr);
        b.call_static(drain, &[resp]);
        b.ret(&[]);
    }
    let f = std.func(&mut p, "loops");
    {
        let mut b = p.body(f);
        b.at(6, 2);
        let (_, resp) = std.get(&mut b);
        b.call_static(drain, &[resp]);
        b.ret(&[]);
    }
    assert_eq!(finding_lines(&run(&p.finish())), vec![6]);
}

#[test]
fn mutual_recursion_terminates_and_still_finds_the_release() {
    let (mut p, std) = Std::new();
    let ping = std.func_sig(&mut p, "ping", &[std.resp_ptr], &[]);
    let pong = std.func_sig(&mut p, "pong", &[std.resp_ptr], &[]);
    {
        let mut b = p.body(ping);
        let resp = b.param("resp", std.resp_ptr);
        b.call_static(pong, &[resp]);
        b.ret(&[]);
    }
    {
        let mut b = p.body(pong);
        let resp = b.param("resp", std.resp_ptr);
        b.call_static(ping, &[resp]);
        let body = std.body(&mut b, resp);
        std.defer_close_body(&mut b, body);
        b.ret(&[]);
    }
    let f = std.func(&mut p, "bounce");
    {
        let mut b = p.body(f);
        let (_, resp) = std.get(&mut b);
        b.call_static(ping, &[resp]);
        b.ret(&[]);
    }
    assert!(run(&p.finish()).is_clean());
}

#[test]
fn recursive_acquirer_terminates() {
    let (mut p, std) = Std::new();
    let again = std.func_sig(&mut p, "again", &[], &[std.resp_ptr]);
    {
        let mut b = p.body(again);
        let resp = b.at(3, 9).call_static(again, &[]);
        b.ret(&[resp]);
    }
    let f = std.func(&mut p, "main");
    {
        let mut b = p.body(f);
        b.at(9, 2).call_static(again, &[]);
        b.ret(&[]);
    }
    let report = run(&p.finish());
    assert_eq!(finding_lines(&report), vec![9]);
    assert_eq!(report.sites_checked, 2);
}

#[test]
fn mutually_recursive_callee_checks_terminate() {
    let (mut p, std) = Std::new();
    let left = std.func_sig(&mut p, "left", &[], &[std.resp_ptr]);
    let right = std.func_sig(&mut p, "right", &[], &[std.resp_ptr]);
    for (from, to) in [(left, right), (right, left)] {
        let mut b = p.body(from);
        let resp = b.call_static(to, &[]);
        let body = std.body(&mut b, resp);
        std.defer_close_body(&mut b, body);
        b.ret(&[resp]);
    }
    let f = std.func(&mut p, "main");
    {
        let mut b = p.body(f);
        b.at(30, 2).call_static(left, &[]);
        b.ret(&[]);
    }
    // Both helpers close what they get, so every site is accepted.
    assert!(run(&p.finish()).is_clean());
}

#[test]
fn depth_limit_fails_closed() {
    let (mut p, std) = Std::new();
    let last = close_resp(&mut p, &std);
    let mut next = last;
    for name in ["hop3", "hop2", "hop1"] {
        let hop = std.func_sig(&mut p, name, &[std.resp_ptr], &[]);
        let mut b = p.body(hop);
        let resp = b.param("resp", std.resp_ptr);
        b.call_static(next, &[resp]);
        b.ret(&[]);
        next = hop;
    }
    let f = std.func(&mut p, "deep");
    {
        let mut b = p.body(f);
        b.at(2, 2);
        let (_, resp) = std.get(&mut b);
        b.call_static(next, &[resp]);
        b.ret(&[]);
    }
    let program = p.finish();
    let config = TargetConfig::default();

    let roomy = Analyzer::new(&program, &config).unwrap().run();
    assert!(roomy.is_clean());

    let tight = Analyzer::new(&program, &config)
        .unwrap()
        .with_options(AnalyzerOptions {
            max_depth: 3,
            ..AnalyzerOptions::default()
        })
        .run();
    assert_eq!(finding_lines(&tight), vec![2]);
}

#[test]
fn parallel_run_matches_sequential() {
    let (mut p, std) = Std::new();
    let helper = get_resp(&mut p, &std, 3);
    let close = close_resp(&mut p, &std);
    for i in 0..12u32 {
        let f = std.func(&mut p, &format!("f{}", i));
        let mut b = p.body(f);
        b.at(100 - i, 2);
        let resp = b.call_static(helper, &[]);
        if i % 3 == 0 {
            b.call_static(close, &[resp]);
        }
        b.ret(&[]);
    }
    let program = p.finish();
    let config = TargetConfig::default();
    let sequential = Analyzer::new(&program, &config).unwrap().run();
    let parallel = Analyzer::new(&program, &config)
        .unwrap()
        .with_options(AnalyzerOptions {
            parallel: true,
            ..AnalyzerOptions::default()
        })
        .run();
    assert_eq!(sequential, parallel);
    assert_eq!(sequential.findings.len(), 8);
    let lines = finding_lines(&sequential);
    assert!(lines.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn collecting_sink_sees_breadcrumbs_without_changing_verdicts() {
    let (mut p, std) = Std::new();
    let close = close_resp(&mut p, &std);
    let f = std.func(&mut p, "traced");
    {
        let mut b = p.body(f);
        b.at(5, 2);
        let (_, resp) = std.get(&mut b);
        b.call_static(close, &[resp]);
        b.ret(&[]);
    }
    let program = p.finish();
    let config = TargetConfig::default();
    let sink = CollectingSink::new();
    let analyzer = Analyzer::new(&program, &config).unwrap().with_sink(&sink);
    let report = analyzer.run();
    assert!(report.is_clean());

    let traces = sink.take();
    assert_eq!(traces.len(), 1);
    let trace = &traces[0];
    assert_eq!(trace.verdict, Verdict::Released);
    let kinds: Vec<StepKind> = trace.steps.iter().map(|s| s.kind).collect();
    assert!(kinds.contains(&StepKind::Forward(close)));
    assert!(kinds.contains(&StepKind::Release));
    assert!(trace.steps.iter().any(|s| s.depth > 0));

    let rendered = trace.steps.last().unwrap().display(&program).to_string();
    assert!(rendered.contains("release"), "{}", rendered);

    let plain = Analyzer::new(&program, &config).unwrap();
    let site = plain.sites()[0];
    assert_eq!(plain.verify(&site), trace.verdict);
}

#[test]
fn concrete_release_method_is_matched() {
    let mut p = ProgramBuilder::new();
    let file = p.file("store/store.go");
    let fd = p.basic("uintptr");
    let error = p.named("", "error");
    let os_file = p.named("os", "File");
    let file_layout = p.struct_type(&[("fd", fd)]);
    p.set_underlying(os_file, file_layout);
    let file_ptr = p.pointer(os_file);
    let close_sig = p.signature(Some(file_ptr), &[], &[error]);
    let close = p.declare("os", "(*File).Close", close_sig, file);
    p.add_method(os_file, "Close", close_sig, Some(close));
    let handle = p.named("example.com/store", "Handle");
    let handle_layout = p.struct_type(&[("Name", fd), ("File", file_ptr)]);
    p.set_underlying(handle, handle_layout);
    let handle_ptr = p.pointer(handle);
    let open_sig = p.signature(None, &[], &[handle_ptr, error]);
    let open = p.declare("example.com/store", "Open", open_sig, file);

    let unit = p_unit(&mut p);
    let user = p.declare("example.com/app", "use", unit, file);
    {
        let mut b = p.body(user);
        let call = b.at(4, 2).call_static(open, &[]);
        let h = b.extract(call, 0);
        let addr = b.field_addr_named(h, "File");
        let f = b.deref(addr);
        b.defer_static(close, &[f]);
        b.at(9, 2);
        let call = b.call_static(open, &[]);
        let h = b.extract(call, 0);
        let name = b.field_addr_named(h, "Name");
        b.deref(name);
        b.ret(&[]);
    }
    let program = p.finish();
    let config = TargetConfig {
        package: "example.com/store".to_string(),
        type_name: "*Handle".to_string(),
        field: "File".to_string(),
        method: "Close".to_string(),
        message: None,
    };
    let report = analyze(&program, &config).unwrap();
    assert_eq!(finding_lines(&report), vec![9]);
    assert_eq!(
        report.findings[0].message,
        "Handle.File of example.com/store.Handle must be released with Close()"
    );
}

fn p_unit(p: &mut ProgramBuilder) -> closecheck_ir::TypeId {
    p.signature(None, &[], &[])
}

#[test]
fn unresolvable_target_is_fatal() {
    let mut p = ProgramBuilder::new();
    let file = p.file("a.go");
    let unit = p_unit(&mut p);
    p.declare("a", "main", unit, file);
    let program = p.finish();
    let err = analyze(&program, &TargetConfig::default()).unwrap_err();
    assert_eq!(
        err,
        ConfigError::PackageNotFound {
            package: "net/http".to_string()
        }
    );
}
