//! Debugger hook.
//!
//! The CPU exposes itself through [`MonitoredCpu`]; a [`Monitor`] attached
//! with `Z80::init_monitor` is consulted at every instruction boundary. When
//! a breakpoint hits (or while single stepping) control goes to a
//! [`StepController`], which inspects the CPU and decides how to resume. The
//! command language of an interactive debugger lives in the controller, not
//! here.
use super::*;
use crate::aspace::AddressSpace;
use crate::registers::{Registers, REG_NAMES};
use crate::z80::Z80;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

/// What the CPU offers to a debugger.
pub trait MonitoredCpu {
    fn label(&self) -> &str;
    fn pc(&self) -> u16;
    fn set_pc(&mut self, addr: u16);
    fn mmap(&self) -> &AddressSpace;
    /// Register or flag value by symbolic name (`ra`, `rhl'`, `rf.z`...).
    fn regvalue(&self, name: &str) -> Option<u16>;
    /// Usage text of the breakpoint command, named `cmd`.
    fn bpdoc(&self, cmd: &str) -> String;
    fn disass(&self, addr: &mut u16, show_pc: bool) -> String;
    fn regs(&self) -> Registers;
    fn set_regs(&mut self, regs: Registers);
    fn status(&self) -> String;
}

impl MonitoredCpu for Z80 {
    fn label(&self) -> &str { Z80::label(self) }
    fn pc(&self) -> u16 { Z80::regs(self).pc }
    fn set_pc(&mut self, addr: u16) { self.regs_mut().pc = addr }
    fn mmap(&self) -> &AddressSpace { Z80::mmap(self) }
    fn regvalue(&self, name: &str) -> Option<u16> { Z80::regs(self).value(name) }

    fn bpdoc(&self, cmd: &str) -> String {
        format!(
            concat!(
                "{0} <addr> [<cond>]\n",
                "  <cond> = <val> <op> <val>\n",
                "  <val>  = [*]{{[#][$]<u16> | <reg>}}\n",
                "  <op>   = < | > | <= | >= | == | != | & | |\n",
                "  <reg>  = {1}\n",
                "  '*' reads the byte at the address, '$' marks hexadecimal, '#' an immediate\n",
                "examples:\n",
                "  {0} $8009 *$fd20 >= #$f0\n",
                "  {0} $8010 ra >= 80\n",
                "  {0} $4100 rf.c == 1"
            ),
            cmd,
            REG_NAMES.join(" ")
        )
    }

    fn disass(&self, addr: &mut u16, show_pc: bool) -> String { Z80::disass(self, addr, show_pc) }
    fn regs(&self) -> Registers { *Z80::regs(self) }
    fn set_regs(&mut self, regs: Registers) { *self.regs_mut() = regs }
    fn status(&self) -> String { Z80::status(self) }
}

lazy_static! {
    static ref RE_COND: Regex =
        Regex::new(r"^\s*([^\s<>=!&|]+)\s*(<=|>=|==|!=|<|>|&|\|)\s*([^\s<>=!&|]+)\s*$").unwrap();
    static ref RE_VALUE: Regex = Regex::new(r"(?i)^(\*)?(?:#?(\$)?([0-9a-f]+)|(r[a-z']+(?:\.[a-z])?))$").unwrap();
}

/// `$` prefixed hexadecimal or plain decimal.
pub fn parse_u16(s: &str) -> Result<u16, Error> {
    let r = match s.strip_prefix('$') {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    r.map_err(|_| monitor_err!("Invalid value: {}", s))
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Const(u16),
    Reg(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Operand {
    deref: bool,
    value: Value,
}

impl Operand {
    fn parse(s: &str) -> Result<Operand, Error> {
        let caps = RE_VALUE.captures(s).ok_or_else(|| monitor_err!("Invalid operand: {}", s))?;
        let deref = caps.get(1).is_some();
        let value = if let Some(name) = caps.get(4) {
            let name = name.as_str().to_ascii_lowercase();
            if Registers::default().value(&name).is_none() {
                return Err(monitor_err!("Unknown register: {}", name));
            }
            Value::Reg(name)
        } else {
            let digits = caps.get(3).map_or("", |m| m.as_str());
            let v = if caps.get(2).is_some() {
                u16::from_str_radix(digits, 16)
            } else {
                digits.parse::<u16>()
            };
            Value::Const(v.map_err(|_| monitor_err!("Invalid value: {}", s))?)
        };
        Ok(Operand { deref, value })
    }

    fn eval(&self, cpu: &dyn MonitoredCpu) -> u16 {
        let v = match &self.value {
            Value::Const(v) => *v,
            Value::Reg(name) => cpu.regvalue(name).unwrap_or(0),
        };
        if self.deref {
            cpu.mmap().peek(v) as u16
        } else {
            v
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

/// Breakpoint condition, `<val> <op> <val>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    lhs: Operand,
    op: CondOp,
    rhs: Operand,
    text: String,
}

impl Condition {
    pub fn parse(text: &str) -> Result<Condition, Error> {
        let caps = RE_COND.captures(text).ok_or_else(|| monitor_err!("Invalid condition: {}", text))?;
        let op = match &caps[2] {
            "<" => CondOp::Lt,
            ">" => CondOp::Gt,
            "<=" => CondOp::Le,
            ">=" => CondOp::Ge,
            "==" => CondOp::Eq,
            "!=" => CondOp::Ne,
            "&" => CondOp::And,
            _ => CondOp::Or,
        };
        Ok(Condition {
            lhs: Operand::parse(&caps[1])?,
            op,
            rhs: Operand::parse(&caps[3])?,
            text: text.trim().to_string(),
        })
    }

    pub fn op(&self) -> CondOp { self.op }

    pub fn eval(&self, cpu: &dyn MonitoredCpu) -> bool {
        let (a, b) = (self.lhs.eval(cpu), self.rhs.eval(cpu));
        match self.op {
            CondOp::Lt => a < b,
            CondOp::Gt => a > b,
            CondOp::Le => a <= b,
            CondOp::Ge => a >= b,
            CondOp::Eq => a == b,
            CondOp::Ne => a != b,
            CondOp::And => a & b != 0,
            CondOp::Or => a | b != 0,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.text) }
}

/// Monitor breakpoints, each with an optional condition.
#[derive(Debug, Default)]
pub struct Breakpoints {
    map: BTreeMap<u16, Option<Condition>>,
}

impl Breakpoints {
    pub fn add(&mut self, addr: u16, cond: Option<Condition>) { self.map.insert(addr, cond); }

    /// Add a breakpoint from its textual form, `<addr> [<cond>]`.
    pub fn add_str(&mut self, spec: &str) -> Result<u16, Error> {
        let spec = spec.trim();
        let (addr, cond) = match spec.split_once(char::is_whitespace) {
            Some((addr, cond)) => (addr, Some(Condition::parse(cond)?)),
            None => (spec, None),
        };
        let addr = parse_u16(addr)?;
        self.add(addr, cond);
        Ok(addr)
    }

    pub fn del(&mut self, addr: u16) -> bool { self.map.remove(&addr).is_some() }
    pub fn clear(&mut self) { self.map.clear() }
    pub fn contains(&self, addr: u16) -> bool { self.map.contains_key(&addr) }
    pub fn len(&self) -> usize { self.map.len() }
    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (u16, Option<&Condition>)> {
        self.map.iter().map(|(addr, cond)| (*addr, cond.as_ref()))
    }

    /// True if there is a breakpoint at `addr` and its condition holds.
    pub fn hit(&self, cpu: &dyn MonitoredCpu, addr: u16) -> bool {
        match self.map.get(&addr) {
            Some(Some(cond)) => cond.eval(cpu),
            Some(None) => true,
            None => false,
        }
    }
}

impl fmt::Display for Breakpoints {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (addr, cond) in self.iter() {
            match cond {
                Some(cond) => writeln!(f, "${:04X} {}", addr, cond)?,
                None => writeln!(f, "${:04X}", addr)?,
            }
        }
        Ok(())
    }
}

/// How to continue after a break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resume {
    Go,
    Step,
    /// restore the register file from the named state and ask again
    Load(String),
    /// store the register file under the given name and ask again
    Save(String),
    Quit,
}

pub trait StepController {
    fn on_break(&mut self, cpu: &mut dyn MonitoredCpu, bps: &mut Breakpoints) -> Resume;
}

pub type LoadFn = Box<dyn FnMut(&str) -> Result<Registers, Error>>;
pub type SaveFn = Box<dyn FnMut(&str, &Registers) -> Result<(), Error>>;

pub struct Monitor {
    bps: Breakpoints,
    ctl: Box<dyn StepController>,
    load: Option<LoadFn>,
    save: Option<SaveFn>,
    stepping: bool,
    log: logger::Logger,
}

impl Monitor {
    pub fn new(ctl: Box<dyn StepController>, log: logger::Logger) -> Monitor {
        Monitor {
            bps: Breakpoints::default(),
            ctl,
            load: None,
            save: None,
            stepping: false,
            log,
        }
    }

    pub fn with_load(mut self, load: impl FnMut(&str) -> Result<Registers, Error> + 'static) -> Monitor {
        self.load = Some(Box::new(load));
        self
    }

    pub fn with_save(mut self, save: impl FnMut(&str, &Registers) -> Result<(), Error> + 'static) -> Monitor {
        self.save = Some(Box::new(save));
        self
    }

    pub fn breakpoints(&self) -> &Breakpoints { &self.bps }
    pub fn breakpoints_mut(&mut self) -> &mut Breakpoints { &mut self.bps }
    pub fn is_stepping(&self) -> bool { self.stepping }

    pub fn is_breakpoint(&self, cpu: &dyn MonitoredCpu, addr: u16) -> bool { self.stepping || self.bps.hit(cpu, addr) }

    /// Hand control to the step controller until it resumes. Returns false
    /// when it asked to quit.
    pub fn run(&mut self, cpu: &mut dyn MonitoredCpu) -> bool {
        loop {
            match self.ctl.on_break(cpu, &mut self.bps) {
                Resume::Go => {
                    self.stepping = false;
                    return true;
                }
                Resume::Step => {
                    self.stepping = true;
                    return true;
                }
                Resume::Quit => return false,
                Resume::Load(name) => match self.load.as_mut() {
                    Some(load) => match load(&name) {
                        Ok(regs) => {
                            cpu.set_regs(regs);
                            info!(self.log, "{}: state loaded from {}, PC ${:04X}", cpu.label(), name, regs.pc);
                        }
                        Err(e) => error!(self.log, "{}: {}", cpu.label(), e),
                    },
                    None => warn!(self.log, "{}: no load handler", cpu.label()),
                },
                Resume::Save(name) => match self.save.as_mut() {
                    Some(save) => match save(&name, &cpu.regs()) {
                        Ok(()) => info!(self.log, "{}: state saved to {}", cpu.label(), name),
                        Err(e) => error!(self.log, "{}: {}", cpu.label(), e),
                    },
                    None => warn!(self.log, "{}: no save handler", cpu.label()),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clockable, Tick};
    use crate::testbench::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    struct Script {
        seen: Rc<RefCell<Vec<u16>>>,
        replies: VecDeque<Resume>,
    }

    impl StepController for Script {
        fn on_break(&mut self, cpu: &mut dyn MonitoredCpu, _: &mut Breakpoints) -> Resume {
            self.seen.borrow_mut().push(cpu.pc());
            self.replies.pop_front().unwrap_or(Resume::Go)
        }
    }

    fn script(replies: Vec<Resume>) -> (Monitor, Rc<RefCell<Vec<u16>>>) {
        let seen = Rc::new(RefCell::new(vec![]));
        let ctl = Script {
            seen: seen.clone(),
            replies: replies.into(),
        };
        (Monitor::new(Box::new(ctl), logger::Logger::silent()), seen)
    }

    #[test]
    fn parse_conditions() {
        let c = Condition::parse("*$fd20 >= #$f0").unwrap();
        assert_eq!(c.op(), CondOp::Ge);
        assert_eq!(c.to_string(), "*$fd20 >= #$f0");
        assert_eq!(Condition::parse("ra>=80").unwrap().op(), CondOp::Ge);
        assert_eq!(Condition::parse("rf.c == 1").unwrap().op(), CondOp::Eq);
        assert_eq!(Condition::parse("rhl' & $ff00").unwrap().op(), CondOp::And);
        assert_eq!(Condition::parse("ra | 0").unwrap().op(), CondOp::Or);
        for bad in ["ra", "ra =< 1", "rq == 1", "ra == f0", "ra == $10000", "== 1"] {
            let e = Condition::parse(bad).unwrap_err();
            assert_eq!(e.kind, ErrorKind::Monitor, "{}", bad);
        }
    }

    #[test]
    fn evaluate_conditions() {
        let mut tb = TestBench::new(&[0x00]);
        tb.poke(0xFD20, &[0xF4]);
        tb.cpu.regs.a = 80;
        tb.cpu.regs.f = crate::registers::C;
        let cpu: &dyn MonitoredCpu = &tb.cpu;
        let holds = |s: &str| Condition::parse(s).unwrap().eval(cpu);
        assert!(holds("*$fd20 >= #$f0"));
        assert!(!holds("*$fd20 < $f0"));
        assert!(holds("ra >= 80"));
        assert!(holds("ra == $50"));
        assert!(holds("rf.c == 1"));
        assert!(!holds("rf.z != 0"));
        assert!(holds("ra & $10"));
    }

    #[test]
    fn breakpoint_table() {
        let mut bps = Breakpoints::default();
        assert_eq!(bps.add_str("$8009 *$fd20 >= #$f0").unwrap(), 0x8009);
        assert_eq!(bps.add_str("4096").unwrap(), 0x1000);
        assert!(bps.add_str("$zz").is_err());
        assert!(bps.add_str("$10 ra ~ 1").is_err());
        assert_eq!(bps.len(), 2);
        assert_eq!(bps.to_string(), "$1000\n$8009 *$fd20 >= #$f0\n");
        assert!(bps.del(0x1000));
        assert!(!bps.del(0x1000));
        assert!(bps.contains(0x8009));
    }

    #[test]
    fn breaks_at_reset_then_steps() {
        let mut tb = TestBench::new(&[0x00; 8]);
        let (mon, seen) = script(vec![Resume::Step, Resume::Step, Resume::Go]);
        tb.cpu.init_monitor(mon);
        for _ in 0..5 {
            tb.step();
        }
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
        assert_eq!(tb.cpu.regs.pc, 5);
    }

    #[test]
    fn conditional_breakpoint() {
        let mut tb = TestBench::new(&[0x3E, 0x42, 0x00, 0x3E, 0x01, 0x00]);
        let (mut mon, seen) = script(vec![]);
        mon.breakpoints_mut().add_str("$0002 ra == $42").unwrap();
        mon.breakpoints_mut().add_str("$0005 ra == $42").unwrap();
        tb.cpu.init_monitor(mon);
        for _ in 0..4 {
            tb.step();
        }
        assert_eq!(*seen.borrow(), vec![0, 2]);
    }

    #[test]
    fn quit_halts_the_clock() {
        let mut tb = TestBench::new(&[0x00]);
        let (mon, _) = script(vec![Resume::Quit]);
        tb.cpu.init_monitor(mon);
        let clk = tb.clk;
        assert_eq!(tb.cpu.tick(&clk), Tick::Halt);
    }

    #[test]
    fn ebreak_enters_the_monitor() {
        let mut tb = TestBench::new(&[0x00; 4]);
        let (mon, seen) = script(vec![]);
        tb.cpu.init_monitor(mon);
        if let Some(m) = tb.cpu.monitor_mut() {
            m.breakpoints_mut().del(0);
        }
        tb.step();
        tb.cpu.ebreak();
        tb.step();
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn load_and_save_state() {
        let mut tb = TestBench::new(&[0x00; 0x20]);
        let saved = Rc::new(RefCell::new(None));
        let s = saved.clone();
        let (mon, seen) = script(vec![Resume::Save("snap".to_string()), Resume::Load("other".to_string())]);
        let mon = mon
            .with_load(|name| {
                if name != "other" {
                    return Err(monitor_err!("no state {}", name));
                }
                let mut regs = Registers::default();
                regs.pc = 0x10;
                regs.a = 0x77;
                Ok(regs)
            })
            .with_save(move |name, regs| {
                *s.borrow_mut() = Some((name.to_string(), *regs));
                Ok(())
            });
        tb.cpu.regs.a = 0x33;
        tb.cpu.init_monitor(mon);
        tb.step();
        assert_eq!(*seen.borrow(), vec![0, 0, 0x10]);
        let saved = saved.borrow();
        let (name, regs) = saved.as_ref().unwrap();
        assert_eq!((name.as_str(), regs.a, regs.pc), ("snap", 0x33, 0));
        assert_eq!(tb.cpu.regs.a, 0x77);
        assert_eq!(tb.cpu.regs.pc, 0x11);
    }

    #[test]
    fn bpdoc_mentions_examples() {
        let tb = TestBench::new(&[0x00]);
        let doc = MonitoredCpu::bpdoc(&tb.cpu, "b");
        assert!(doc.starts_with("b <addr> [<cond>]"));
        assert!(doc.contains("b $4100 rf.c == 1"));
        assert!(doc.contains("rhl'"));
    }
}
