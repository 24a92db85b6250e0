// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! A small slice of the Go standard library, enough to write the test
//! programs the way the Go SSA builder would lower them.

#![allow(dead_code)]

use closecheck_analysis::{analyze, Report, TargetConfig};
use closecheck_ir::{FileId, FuncId, FunctionBuilder, MethodId, Program, ProgramBuilder, TypeId, ValueId};

pub struct Std {
    pub file: FileId,
    pub string: TypeId,
    pub int: TypeId,
    pub bool_: TypeId,
    pub error: TypeId,
    pub bytes: TypeId,
    /// `io.Closer`, sharing its `Close` with `io.ReadCloser`.
    pub closer: TypeId,
    pub read_closer: TypeId,
    pub read: MethodId,
    pub close: MethodId,
    pub response: TypeId,
    pub resp_ptr: TypeId,
    /// `func http.Get(url string) (*http.Response, error)`
    pub get: FuncId,
    /// `func (*http.Response) Cookies() []string`, external.
    pub cookies: FuncId,
    /// `func()`
    pub unit: TypeId,
}

impl Std {
    pub fn new() -> (ProgramBuilder, Std) {
        let mut p = ProgramBuilder::new();
        let http_file = p.file("net/http/client.go");
        let file = p.file("a/func.go");

        let string = p.basic("string");
        let int = p.basic("int");
        let bool_ = p.basic("bool");
        let byte = p.basic("byte");
        let bytes = p.slice(byte);
        let error = p.named("", "error");
        let error_sig = p.signature(None, &[], &[string]);
        let error_method = p.interface_method("Error", Some(error_sig));
        let error_iface = p.interface(&[error_method]);
        p.set_underlying(error, error_iface);

        let read_sig = p.signature(None, &[bytes], &[int, error]);
        let close_sig = p.signature(None, &[], &[error]);
        let read = p.interface_method("Read", Some(read_sig));
        let close = p.interface_method("Close", Some(close_sig));
        let closer = p.named("io", "Closer");
        let closer_iface = p.interface(&[close]);
        p.set_underlying(closer, closer_iface);
        let read_closer = p.named("io", "ReadCloser");
        let read_closer_iface = p.interface(&[read, close]);
        p.set_underlying(read_closer, read_closer_iface);

        let response = p.named("net/http", "Response");
        let layout = p.struct_type(&[("Status", string), ("StatusCode", int), ("Body", read_closer)]);
        p.set_underlying(response, layout);
        let resp_ptr = p.pointer(response);

        let get_sig = p.signature(None, &[string], &[resp_ptr, error]);
        let get = p.declare("net/http", "Get", get_sig, http_file);
        let strings = p.slice(string);
        let cookies_sig = p.signature(Some(resp_ptr), &[], &[strings]);
        let cookies = p.declare("net/http", "(*Response).Cookies", cookies_sig, http_file);
        p.add_method(response, "Cookies", cookies_sig, Some(cookies));

        let unit = p.signature(None, &[], &[]);

        let std = Std {
            file,
            string,
            int,
            bool_,
            error,
            bytes,
            closer,
            read_closer,
            read,
            close,
            response,
            resp_ptr,
            get,
            cookies,
            unit,
        };
        (p, std)
    }

    /// `func name()` in package `a`.
    pub fn func(&self, p: &mut ProgramBuilder, name: &str) -> FuncId {
        p.declare("a", name, self.unit, self.file)
    }

    /// `func name(params...) (results...)` in package `a`.
    pub fn func_sig(&self, p: &mut ProgramBuilder, name: &str, params: &[TypeId], results: &[TypeId]) -> FuncId {
        let sig = p.signature(None, params, results);
        p.declare("a", name, sig, self.file)
    }

    /// `resp, err := http.Get("https://example.com")` followed by the
    /// `err != nil` test. Returns the call and `resp`.
    pub fn get(&self, b: &mut FunctionBuilder<'_>) -> (ValueId, ValueId) {
        let url = b.constant(self.string, "\"https://example.com\"");
        let call = b.call_static(self.get, &[url]);
        let resp = b.extract(call, 0);
        let err = b.extract(call, 1);
        let nil = b.constant(self.error, "nil");
        b.other("!=", &[err, nil], Some(self.bool_));
        (call, resp)
    }

    /// `resp.Body`, loaded.
    pub fn body(&self, b: &mut FunctionBuilder<'_>, resp: ValueId) -> ValueId {
        let addr = b.field_addr_named(resp, "Body");
        b.deref(addr)
    }

    pub fn close_body(&self, b: &mut FunctionBuilder<'_>, body: ValueId) {
        b.invoke(body, self.close, &[]);
    }

    pub fn defer_close_body(&self, b: &mut FunctionBuilder<'_>, body: ValueId) {
        b.defer_invoke(body, self.close, &[]);
    }

    /// `resp.Body.Read(make([]byte, 0))`
    pub fn read_body(&self, b: &mut FunctionBuilder<'_>, resp: ValueId) {
        let body = self.body(b, resp);
        let buf = b.constant(self.bytes, "make([]byte, 0)");
        b.invoke(body, self.read, &[buf]);
    }
}

pub fn run(program: &Program) -> Report {
    match analyze(program, &TargetConfig::default()) {
        Ok(report) => report,
        Err(e) => panic!("target did not resolve: {}", e),
    }
}

/// `line` of every finding, in report order.
pub fn finding_lines(report: &Report) -> Vec<u32> {
    report.findings.iter().map(|f| f.pos.line).collect()
}
