// Copyright 2025 Irreducible Inc.

use std::{
	collections::HashMap,
	fmt::{self, Debug},
	mem,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc, Condvar, Mutex, OnceLock, PoisonError,
	},
	time::Duration,
};

use algebrix_algebra::{Element, Structure};
use num_bigint::BigInt;

use crate::{Error, Evaluator, ExponentExpr, GroupElementExpr};

/// The result of a computation that may still be running on the rayon pool.
pub struct Deferred<T> {
	inner: Arc<DeferredInner<T>>,
}

struct DeferredInner<T> {
	value: Mutex<Option<T>>,
	done: Condvar,
}

impl<T> Deferred<T> {
	/// A handle whose value is already known.
	pub fn ready(value: T) -> Self {
		Self {
			inner: Arc::new(DeferredInner {
				value: Mutex::new(Some(value)),
				done: Condvar::new(),
			}),
		}
	}

	pub fn is_ready(&self) -> bool {
		self.inner
			.value
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.is_some()
	}

	/// Blocks until the value is available.
	///
	/// On a rayon worker the wait executes other pending jobs, so waiting on a job queued on
	/// the same pool cannot deadlock.
	pub fn wait(self) -> T {
		let mut value = self
			.inner
			.value
			.lock()
			.unwrap_or_else(PoisonError::into_inner);
		loop {
			if let Some(value) = value.take() {
				return value;
			}
			if rayon::current_thread_index().is_some() {
				drop(value);
				if rayon::yield_now() != Some(rayon::Yield::Executed) {
					std::thread::yield_now();
				}
				value = self
					.inner
					.value
					.lock()
					.unwrap_or_else(PoisonError::into_inner);
			} else {
				value = self
					.inner
					.done
					.wait_timeout(value, Duration::from_millis(50))
					.unwrap_or_else(PoisonError::into_inner)
					.0;
			}
		}
	}
}

impl<T: Send + 'static> Deferred<T> {
	/// Runs `f` on the rayon pool.
	pub fn spawn(f: impl FnOnce() -> T + Send + 'static) -> Self {
		let inner = Arc::new(DeferredInner {
			value: Mutex::new(None),
			done: Condvar::new(),
		});
		let completion = inner.clone();
		rayon::spawn(move || {
			let result = f();
			*completion
				.value
				.lock()
				.unwrap_or_else(PoisonError::into_inner) = Some(result);
			completion.done.notify_all();
		});
		Self { inner }
	}
}

impl<T> Debug for Deferred<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Deferred")
			.field("ready", &self.is_ready())
			.finish()
	}
}

/// Pending sub-graphs deeper than this are forced in segments.
const MAX_PENDING_DEPTH: usize = 128;

/// A group element whose operations are recorded rather than performed.
///
/// Forcing an element turns the recorded graph into a [`GroupElementExpr`] and evaluates it with
/// the owning [`Evaluator`], so a chain of operations becomes one multi-exponentiation. Every
/// element is computed at most once; clones share the result. Chains longer than
/// `MAX_PENDING_DEPTH` are evaluated a segment at a time, bottom-up.
#[derive(Clone)]
pub struct LazyElement {
	inner: Arc<LazyInner>,
}

struct LazyInner {
	node: LazyNode,
	structure: Structure,
	evaluator: Evaluator,
	value: OnceLock<Result<Element, Error>>,
	started: AtomicBool,
}

enum LazyNode {
	Value(Element),
	Op(LazyElement, LazyElement),
	Inv(LazyElement),
	Pow(LazyElement, BigInt),
	/// Children already handed over to the iterative drop.
	Released,
}

impl LazyNode {
	fn children(&self) -> impl DoubleEndedIterator<Item = &LazyElement> {
		let (first, second) = match self {
			LazyNode::Op(lhs, rhs) => (Some(lhs), Some(rhs)),
			LazyNode::Inv(child) | LazyNode::Pow(child, _) => (Some(child), None),
			LazyNode::Value(_) | LazyNode::Released => (None, None),
		};
		first.into_iter().chain(second)
	}

	fn into_children(self) -> Vec<LazyElement> {
		match self {
			LazyNode::Op(lhs, rhs) => vec![lhs, rhs],
			LazyNode::Inv(child) | LazyNode::Pow(child, _) => vec![child],
			LazyNode::Value(_) | LazyNode::Released => Vec::new(),
		}
	}
}

impl Drop for LazyInner {
	/// Releases the graph iteratively, one uniquely owned node at a time.
	fn drop(&mut self) {
		let mut pending = mem::replace(&mut self.node, LazyNode::Released).into_children();
		while let Some(child) = pending.pop() {
			if let Some(mut inner) = Arc::into_inner(child.inner) {
				pending.extend(mem::replace(&mut inner.node, LazyNode::Released).into_children());
			}
		}
	}
}

impl LazyElement {
	/// Wraps a known element.
	pub fn new(evaluator: &Evaluator, element: Element) -> Self {
		let structure = element.structure().clone();
		let lazy = Self::from_node(evaluator.clone(), structure, LazyNode::Value(element.clone()));
		let _ = lazy.inner.value.set(Ok(element));
		lazy
	}

	fn from_node(evaluator: Evaluator, structure: Structure, node: LazyNode) -> Self {
		Self {
			inner: Arc::new(LazyInner {
				node,
				structure,
				evaluator,
				value: OnceLock::new(),
				started: AtomicBool::new(false),
			}),
		}
	}

	pub fn structure(&self) -> &Structure {
		&self.inner.structure
	}

	/// Records `self · rhs`.
	///
	/// Panics if the elements belong to different structures.
	pub fn op(&self, rhs: &LazyElement) -> Self {
		assert_eq!(
			self.structure(),
			rhs.structure(),
			"cannot combine lazy elements of different structures"
		);
		self.derive(LazyNode::Op(self.clone(), rhs.clone()))
	}

	pub fn inv(&self) -> Self {
		self.derive(LazyNode::Inv(self.clone()))
	}

	pub fn pow(&self, exponent: impl Into<BigInt>) -> Self {
		self.derive(LazyNode::Pow(self.clone(), exponent.into()))
	}

	fn derive(&self, node: LazyNode) -> Self {
		Self::from_node(self.inner.evaluator.clone(), self.structure().clone(), node)
	}

	pub fn is_ready(&self) -> bool {
		self.inner.value.get().is_some()
	}

	/// Starts computing the element on the rayon pool and returns immediately.
	pub fn compute(&self) -> &Self {
		if !self.is_ready() && !self.inner.started.swap(true, Ordering::AcqRel) {
			let lazy = self.clone();
			rayon::spawn(move || {
				lazy.force();
			});
		}
		self
	}

	/// The value of the element, joining a running background computation if there is one.
	pub fn compute_sync(&self) -> Result<Element, Error> {
		self.force().clone()
	}

	fn force(&self) -> &Result<Element, Error> {
		if let Some(value) = self.inner.value.get() {
			return value;
		}
		let segments = self.force_deep_nodes();
		self.inner.value.get_or_init(|| {
			segments?;
			self.inner.evaluator.evaluate(&self.to_expr())
		})
	}

	/// Evaluates the recorded graph of this node without looking at its depth.
	fn force_shallow(&self) -> &Result<Element, Error> {
		self.inner
			.value
			.get_or_init(|| self.inner.evaluator.evaluate(&self.to_expr()))
	}

	/// Forces, children first, every pending node at a multiple of `MAX_PENDING_DEPTH` above the
	/// computed nodes below it.
	fn force_deep_nodes(&self) -> Result<(), Error> {
		let mut depths = HashMap::<*const LazyInner, usize>::new();
		let mut stack = vec![(self, false)];
		while let Some((lazy, expanded)) = stack.pop() {
			let key = Arc::as_ptr(&lazy.inner);
			if lazy.is_ready() || (!expanded && depths.contains_key(&key)) {
				continue;
			}
			if !expanded {
				stack.push((lazy, true));
				stack.extend(lazy.inner.node.children().map(|child| (child, false)));
				continue;
			}
			let depth = 1 + lazy
				.inner
				.node
				.children()
				.filter_map(|child| depths.get(&Arc::as_ptr(&child.inner)))
				.max()
				.copied()
				.unwrap_or(0);
			if depth < MAX_PENDING_DEPTH {
				depths.insert(key, depth);
				continue;
			}
			if let Err(err) = lazy.force_shallow() {
				return Err(err.clone());
			}
			depths.insert(key, 0);
		}
		Ok(())
	}

	/// The recorded graph as an expression, with computed sub-elements as constants.
	pub fn to_expr(&self) -> GroupElementExpr {
		enum Step<'a> {
			Visit(&'a LazyElement),
			Build(&'a LazyNode),
		}

		let mut steps = vec![Step::Visit(self)];
		let mut built = Vec::<GroupElementExpr>::new();
		while let Some(step) = steps.pop() {
			match step {
				Step::Visit(lazy) => match (lazy.inner.value.get(), &lazy.inner.node) {
					(Some(Ok(value)), _) | (_, LazyNode::Value(value)) => {
						built.push(GroupElementExpr::Constant(value.clone()));
					}
					(_, node) => {
						steps.push(Step::Build(node));
						steps.extend(node.children().rev().map(Step::Visit));
					}
				},
				Step::Build(node) => {
					let mut operand = || built.pop().expect("children are built before parents");
					let expr = match node {
						LazyNode::Op(..) => {
							let rhs = operand();
							operand().op(rhs)
						}
						LazyNode::Inv(_) => operand().inv(),
						LazyNode::Pow(_, exponent) => {
							operand().pow(ExponentExpr::Constant(exponent.clone()))
						}
						LazyNode::Value(_) | LazyNode::Released => {
							unreachable!("only live interior nodes are built")
						}
					};
					built.push(expr);
				}
			}
		}
		built.pop().expect("the root is built last")
	}
}

impl PartialEq for LazyElement {
	/// Forces both sides; elements that fail to evaluate are unequal to everything.
	fn eq(&self, other: &Self) -> bool {
		other.compute();
		match (self.compute_sync(), other.compute_sync()) {
			(Ok(lhs), Ok(rhs)) => lhs == rhs,
			_ => false,
		}
	}
}

impl Debug for LazyElement {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.inner.value.get() {
			Some(Ok(value)) => write!(f, "LazyElement({value:?})"),
			_ => write!(f, "LazyElement({})", self.to_expr()),
		}
	}
}
