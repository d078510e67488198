/// Fraction of predictions equal to the expected class.
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    assert_eq!(y_true.len(), y_pred.len(), "Length mismatch");
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

/// Precision for a specific class.
pub fn precision_class(y_true: &[usize], y_pred: &[usize], class: usize) -> f64 {
    let mut tp = 0usize;
    let mut fp = 0usize;
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if p == class {
            if t == class {
                tp += 1;
            } else {
                fp += 1;
            }
        }
    }
    if tp + fp == 0 {
        0.0
    } else {
        tp as f64 / (tp + fp) as f64
    }
}

/// Recall for a specific class.
pub fn recall_class(y_true: &[usize], y_pred: &[usize], class: usize) -> f64 {
    let mut tp = 0usize;
    let mut fn_ = 0usize;
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t == class {
            if p == class {
                tp += 1;
            } else {
                fn_ += 1;
            }
        }
    }
    if tp + fn_ == 0 {
        0.0
    } else {
        tp as f64 / (tp + fn_) as f64
    }
}

/// F1 score for a specific class.
pub fn f1_score_class(y_true: &[usize], y_pred: &[usize], class: usize) -> f64 {
    let p = precision_class(y_true, y_pred, class);
    let r = recall_class(y_true, y_pred, class);
    if p + r == 0.0 {
        0.0
    } else {
        2.0 * p * r / (p + r)
    }
}

/// F1 score of every class in index order.
pub fn f1_per_class(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Vec<f64> {
    (0..n_classes)
        .map(|c| f1_score_class(y_true, y_pred, c))
        .collect()
}

/// Macro-averaged F1 score.
pub fn f1_macro(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> f64 {
    if n_classes == 0 {
        return 0.0;
    }
    f1_per_class(y_true, y_pred, n_classes).iter().sum::<f64>() / n_classes as f64
}
